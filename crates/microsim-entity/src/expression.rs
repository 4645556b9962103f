//! Attributes recomputed from the owning entity on demand.

use crate::attribute::AttributeDef;

/// Static description of an expression attribute.
pub struct ExpressionDef<E, C, T, X> {
    /// The underlying attribute.
    pub attribute: AttributeDef<E, C, T, X>,
    /// Evaluator with read access to the whole entity.
    pub expression: fn(&E) -> T,
}

impl<E, C, T: Copy + PartialEq, X> ExpressionDef<E, C, T, X> {
    /// Recompute and store the value. Returns whether it changed.
    ///
    /// # Errors
    ///
    /// Propagates hook errors from the underlying attribute.
    pub fn evaluate(&self, entity: &mut E, ctx: &mut C) -> Result<bool, X> {
        let value = (self.expression)(entity);
        self.attribute.set(entity, ctx, value)
    }

    /// Last computed value.
    pub fn get(&self, entity: &E) -> T {
        self.attribute.get(entity)
    }
}

impl<E, C, T, X> std::fmt::Debug for ExpressionDef<E, C, T, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionDef")
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}
