//! Plain attributes with change notification and side effects.
//!
//! An [`Attribute`] is only storage. Its behavior lives in a static
//! [`AttributeDef`] describing how to reach the attribute inside its
//! owning entity and which hooks run when it changes:
//!
//! - `notify` runs *before* the value changes. Tables use it to resolve a
//!   pending increment close while the old value is still in place.
//! - `side_effect` runs *after* the value changes, with the old and new
//!   values.
//!
//! Neither hook runs when the assigned value equals the current value.
//! Hooks are ordinary code and may set other attributes; they return
//! `Result` so that an invariant violation raised downstream (for example
//! by an increment) halts the member instead of being swallowed.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Hook run before an attribute changes.
pub type NotifyHook<E, C, X> = fn(&mut E, &mut C) -> Result<(), X>;

/// Hook run after an attribute changes, with `(old, new)` values.
pub type SideEffectHook<E, C, T, X> = fn(&mut E, &mut C, T, T) -> Result<(), X>;

/// Observable scalar value owned by an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attribute<T> {
    value: T,
}

impl<T: Copy + PartialEq> Attribute<T> {
    /// Create an attribute holding `value`.
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    /// Set the initial value. Never runs hooks.
    pub fn initialize(&mut self, value: T) {
        self.value = value;
    }

    /// Current value.
    pub const fn get(&self) -> T {
        self.value
    }

    /// Store `value` if it differs from the current one, returning the
    /// previous value. Returns `None` and leaves storage untouched otherwise.
    pub fn replace(&mut self, value: T) -> Option<T> {
        if self.value == value {
            return None;
        }
        Some(std::mem::replace(&mut self.value, value))
    }
}

impl<T> Deref for Attribute<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Static description of one attribute of entity type `E`.
///
/// `C` is the per-member context the hooks receive and `X` the error type
/// they may raise.
pub struct AttributeDef<E, C, T, X> {
    /// Attribute name as declared by the model.
    pub name: &'static str,
    /// Shared accessor into the owning entity.
    pub read: fn(&E) -> &Attribute<T>,
    /// Mutable accessor into the owning entity.
    pub write: fn(&mut E) -> &mut Attribute<T>,
    /// Pre-change hook.
    pub notify: Option<NotifyHook<E, C, X>>,
    /// Post-change hook.
    pub side_effect: Option<SideEffectHook<E, C, T, X>>,
}

impl<E, C, T: Copy + PartialEq, X> AttributeDef<E, C, T, X> {
    /// Definition with no hooks.
    pub const fn plain(
        name: &'static str,
        read: fn(&E) -> &Attribute<T>,
        write: fn(&mut E) -> &mut Attribute<T>,
    ) -> Self {
        Self {
            name,
            read,
            write,
            notify: None,
            side_effect: None,
        }
    }

    /// Current value of the attribute in `entity`.
    pub fn get(&self, entity: &E) -> T {
        (self.read)(entity).get()
    }

    /// Assign `value`. Returns whether the value changed.
    ///
    /// When it changes, `notify` runs first, then the value is stored, then
    /// `side_effect` runs with the old and new values.
    ///
    /// # Errors
    ///
    /// Propagates the first error raised by a hook.
    pub fn set(&self, entity: &mut E, ctx: &mut C, value: T) -> Result<bool, X> {
        if self.get(entity) == value {
            return Ok(false);
        }
        if let Some(notify) = self.notify {
            notify(entity, ctx)?;
        }
        let Some(old) = (self.write)(entity).replace(value) else {
            return Ok(false);
        };
        if let Some(side_effect) = self.side_effect {
            side_effect(entity, ctx, old, value)?;
        }
        Ok(true)
    }
}

impl<E, C, T, X> std::fmt::Debug for AttributeDef<E, C, T, X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeDef")
            .field("name", &self.name)
            .field("notify", &self.notify.is_some())
            .field("side_effect", &self.side_effect.is_some())
            .finish()
    }
}
