//! Single weak references between entities.
//!
//! A [`Link<B>`] stores at most one [`EntityId`] of an entity of type `B`.
//! It never owns its target; reads through it go via
//! [`EntityArena::follow`](crate::arena::EntityArena::follow), which yields
//! the null entity when the link is unset.
//!
//! [`LinkDef`] assigns links and keeps the reverse side consistent: when a
//! link moves from `old` to `new`, the erase-reciprocal hook runs for
//! `old` and the insert-reciprocal hook for `new`. Reciprocal pairs
//! terminate naturally because re-assigning an unchanged link is a no-op.

use std::fmt;
use std::marker::PhantomData;

use microsim_types::EntityId;

use crate::arena::EntityArena;
use crate::error::EntityError;

/// Hook keeping the other side of a relationship in step.
///
/// Receives the arena of the owning entity type, the context, the owner's
/// id and the id of the entity being linked or unlinked.
pub type ReciprocalHook<A, C, X> =
    fn(&mut EntityArena<A>, &mut C, EntityId, EntityId) -> Result<(), X>;

/// Hook run on the owner after its link changed, with `(old, new)` targets.
pub type LinkSideEffectHook<A, C, X> =
    fn(&mut A, &mut C, Option<EntityId>, Option<EntityId>) -> Result<(), X>;

/// Weak reference to at most one entity of type `B`.
pub struct Link<B> {
    target: Option<EntityId>,
    marker: PhantomData<fn() -> B>,
}

impl<B> Link<B> {
    /// An unset link.
    pub const fn empty() -> Self {
        Self {
            target: None,
            marker: PhantomData,
        }
    }

    /// A link to `target`.
    pub const fn to(target: EntityId) -> Self {
        Self {
            target: Some(target),
            marker: PhantomData,
        }
    }

    /// Current target.
    pub const fn get(&self) -> Option<EntityId> {
        self.target
    }

    /// Whether the link is set.
    pub const fn is_set(&self) -> bool {
        self.target.is_some()
    }

    /// Store `target` if it differs, returning the previous target.
    pub fn replace(&mut self, target: Option<EntityId>) -> Option<Option<EntityId>> {
        if self.target == target {
            return None;
        }
        Some(std::mem::replace(&mut self.target, target))
    }
}

impl<B> Clone for Link<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Link<B> {}

impl<B> Default for Link<B> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<B> PartialEq for Link<B> {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl<B> Eq for Link<B> {}

impl<B> fmt::Debug for Link<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(id) => write!(f, "Link({id})"),
            None => f.write_str("Link(null)"),
        }
    }
}

/// Static description of a link field of entity type `A` pointing at `B`.
pub struct LinkDef<A, B, C, X> {
    /// Link name as declared by the model.
    pub name: &'static str,
    /// Shared accessor into the owning entity.
    pub read: fn(&A) -> &Link<B>,
    /// Mutable accessor into the owning entity.
    pub write: fn(&mut A) -> &mut Link<B>,
    /// Post-change hook on the owner.
    pub side_effect: Option<LinkSideEffectHook<A, C, X>>,
    /// Runs for the new target after the link is set.
    pub insert_reciprocal: Option<ReciprocalHook<A, C, X>>,
    /// Runs for the previous target after the link is moved or cleared.
    pub erase_reciprocal: Option<ReciprocalHook<A, C, X>>,
}

impl<A, B, C, X: From<EntityError>> LinkDef<A, B, C, X> {
    /// Current target of `owner`'s link.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EntityNotFound`] if `owner` is not live.
    pub fn get(&self, arena: &EntityArena<A>, owner: EntityId) -> Result<Option<EntityId>, X> {
        Ok((self.read)(arena.entity(owner)?).get())
    }

    /// Point `owner`'s link at `target`. Returns whether the link changed.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EntityNotFound`] if `owner` is not live, or
    /// the first error raised by a hook.
    pub fn set(
        &self,
        arena: &mut EntityArena<A>,
        ctx: &mut C,
        owner: EntityId,
        target: Option<EntityId>,
    ) -> Result<bool, X> {
        let entity = arena.entity_mut(owner)?;
        let Some(old) = (self.write)(entity).replace(target) else {
            return Ok(false);
        };
        if let Some(side_effect) = self.side_effect {
            side_effect(entity, ctx, old, target)?;
        }
        if let (Some(erase), Some(old)) = (self.erase_reciprocal, old) {
            erase(arena, ctx, owner, old)?;
        }
        if let (Some(insert), Some(new)) = (self.insert_reciprocal, target) {
            insert(arena, ctx, owner, new)?;
        }
        Ok(true)
    }

    /// Unset `owner`'s link. Returns whether it was set.
    ///
    /// # Errors
    ///
    /// See [`Self::set`].
    pub fn clear(&self, arena: &mut EntityArena<A>, ctx: &mut C, owner: EntityId) -> Result<bool, X> {
        self.set(arena, ctx, owner, None)
    }
}

impl<A, B, C, X> fmt::Debug for LinkDef<A, B, C, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkDef")
            .field("name", &self.name)
            .field("reciprocal", &self.insert_reciprocal.is_some())
            .finish_non_exhaustive()
    }
}
