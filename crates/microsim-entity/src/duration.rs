//! Time-integrated attributes.
//!
//! A duration attribute accumulates elapsed simulated time while an
//! optional activity condition holds. It only moves forward: waits with a
//! non-positive delta are ignored. All changes go through the wrapped
//! [`AttributeDef::set`], so hooks run exactly as for a plain attribute.

use crate::attribute::AttributeDef;

/// Static description of a duration attribute.
pub struct DurationDef<E, C, X> {
    /// The underlying attribute.
    pub attribute: AttributeDef<E, C, f64, X>,
    /// Activity condition; the duration advances only while it holds.
    pub condition: Option<fn(&E) -> bool>,
}

impl<E, C, X> DurationDef<E, C, X> {
    /// Advance by `delta` if the condition holds. Returns whether the value changed.
    ///
    /// # Errors
    ///
    /// Propagates hook errors from the underlying attribute.
    pub fn wait(&self, entity: &mut E, ctx: &mut C, delta: f64) -> Result<bool, X> {
        if delta.is_nan() || delta <= 0.0 {
            return Ok(false);
        }
        if self.condition.is_some_and(|condition| !condition(entity)) {
            return Ok(false);
        }
        let value = self.attribute.get(entity) + delta;
        self.attribute.set(entity, ctx, value)
    }

    /// Reset to zero. Returns whether the value changed.
    ///
    /// # Errors
    ///
    /// Propagates hook errors from the underlying attribute.
    pub fn reset(&self, entity: &mut E, ctx: &mut C) -> Result<bool, X> {
        self.attribute.set(entity, ctx, 0.0)
    }

    /// Current accumulated duration.
    pub fn get(&self, entity: &E) -> f64 {
        self.attribute.get(entity)
    }
}

impl<E, C, X> std::fmt::Debug for DurationDef<E, C, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationDef")
            .field("attribute", &self.attribute)
            .field("conditional", &self.condition.is_some())
            .finish()
    }
}
