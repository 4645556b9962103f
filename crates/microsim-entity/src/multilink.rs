//! Sets of weak references between entities.
//!
//! A [`Multilink<B>`] holds each target at most once. Erased members leave
//! a hole in the backing slots and the next insert fills the first hole
//! before the storage grows, so iteration order is not insertion order and
//! must not be relied upon.
//!
//! [`MultilinkDef`] performs the observable operations: the owner's side
//! effect runs exactly once per successful insert or erase (never for a
//! duplicate insert or a missing erase) and once for a `clear` that removed
//! anything; reciprocal hooks run once per affected member.

use std::fmt;
use std::marker::PhantomData;

use microsim_types::{EntityId, WarningLimiter};
use tracing::warn;

use crate::arena::EntityArena;
use crate::error::EntityError;
use crate::link::ReciprocalHook;

/// Slot count beyond which a multilink is reported as suspiciously large.
pub const LARGE_MULTILINK_SLOTS: usize = 1000;

static LARGE_MULTILINK_WARNING: WarningLimiter = WarningLimiter::new(1);

/// Hook run on the owner after its membership changed.
pub type MultilinkSideEffectHook<A, C, X> = fn(&mut A, &mut C) -> Result<(), X>;

/// Unordered set of weak references to entities of type `B`.
pub struct Multilink<B> {
    slots: Vec<Option<EntityId>>,
    marker: PhantomData<fn() -> B>,
}

impl<B> Multilink<B> {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Add `target` unless present. Returns whether it was added.
    ///
    /// Fills the first hole left by an earlier erase before growing.
    pub fn insert_slot(&mut self, target: EntityId) -> bool {
        let mut hole = None;
        for (position, slot) in self.slots.iter().enumerate() {
            match slot {
                Some(id) if *id == target => return false,
                None if hole.is_none() => hole = Some(position),
                _ => {}
            }
        }
        if let Some(slot) = hole.and_then(|position| self.slots.get_mut(position)) {
            *slot = Some(target);
        } else {
            self.slots.push(Some(target));
            if self.slots.len() > LARGE_MULTILINK_SLOTS && LARGE_MULTILINK_WARNING.allow() {
                warn!(
                    slots = self.slots.len(),
                    limit = LARGE_MULTILINK_SLOTS,
                    "Multilink grew unusually large"
                );
            }
        }
        true
    }

    /// Remove `target` if present, leaving a hole. Returns whether it was removed.
    pub fn erase_slot(&mut self, target: EntityId) -> bool {
        match self.slots.iter_mut().find(|slot| **slot == Some(target)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Remove every member, returning them in slot order.
    pub fn take_all(&mut self) -> Vec<EntityId> {
        self.slots.drain(..).flatten().collect()
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Number of backing slots, holes included.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether `target` is a member.
    pub fn contains(&self, target: EntityId) -> bool {
        self.slots.contains(&Some(target))
    }

    /// Iterate over members in slot order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// Members rendered as a comma-separated id list.
    pub fn contents(&self) -> String {
        self.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
    }
}

impl<B> Default for Multilink<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Clone for Multilink<B> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            marker: PhantomData,
        }
    }
}

impl<B> fmt::Debug for Multilink<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multilink[{}]", self.contents())
    }
}

/// Static description of a multilink field of entity type `A` holding `B`s.
pub struct MultilinkDef<A, B, C, X> {
    /// Multilink name as declared by the model.
    pub name: &'static str,
    /// Shared accessor into the owning entity.
    pub read: fn(&A) -> &Multilink<B>,
    /// Mutable accessor into the owning entity.
    pub write: fn(&mut A) -> &mut Multilink<B>,
    /// Runs on the owner once per successful operation.
    pub side_effect: Option<MultilinkSideEffectHook<A, C, X>>,
    /// Runs for each member added.
    pub insert_reciprocal: Option<ReciprocalHook<A, C, X>>,
    /// Runs for each member removed.
    pub erase_reciprocal: Option<ReciprocalHook<A, C, X>>,
}

impl<A, B, C, X: From<EntityError>> MultilinkDef<A, B, C, X> {
    /// Add `target` to `owner`'s set. Returns whether it was added.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EntityNotFound`] if `owner` is not live, or
    /// the first error raised by a hook.
    pub fn insert(
        &self,
        arena: &mut EntityArena<A>,
        ctx: &mut C,
        owner: EntityId,
        target: EntityId,
    ) -> Result<bool, X> {
        let entity = arena.entity_mut(owner)?;
        if !(self.write)(entity).insert_slot(target) {
            return Ok(false);
        }
        if let Some(side_effect) = self.side_effect {
            side_effect(entity, ctx)?;
        }
        if let Some(insert) = self.insert_reciprocal {
            insert(arena, ctx, owner, target)?;
        }
        Ok(true)
    }

    /// Remove `target` from `owner`'s set. Returns whether it was removed.
    ///
    /// # Errors
    ///
    /// See [`Self::insert`].
    pub fn erase(
        &self,
        arena: &mut EntityArena<A>,
        ctx: &mut C,
        owner: EntityId,
        target: EntityId,
    ) -> Result<bool, X> {
        let entity = arena.entity_mut(owner)?;
        if !(self.write)(entity).erase_slot(target) {
            return Ok(false);
        }
        if let Some(side_effect) = self.side_effect {
            side_effect(entity, ctx)?;
        }
        if let Some(erase) = self.erase_reciprocal {
            erase(arena, ctx, owner, target)?;
        }
        Ok(true)
    }

    /// Remove every member of `owner`'s set. Returns how many were removed.
    ///
    /// The side effect runs once, after every erase-reciprocal hook, and
    /// only if something was removed.
    ///
    /// # Errors
    ///
    /// See [`Self::insert`].
    pub fn clear(
        &self,
        arena: &mut EntityArena<A>,
        ctx: &mut C,
        owner: EntityId,
    ) -> Result<usize, X> {
        let members = (self.write)(arena.entity_mut(owner)?).take_all();
        if members.is_empty() {
            return Ok(0);
        }
        if let Some(erase) = self.erase_reciprocal {
            for member in &members {
                erase(arena, ctx, owner, *member)?;
            }
        }
        if let Some(side_effect) = self.side_effect {
            side_effect(arena.entity_mut(owner)?, ctx)?;
        }
        Ok(members.len())
    }

    /// Number of members in `owner`'s set.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EntityNotFound`] if `owner` is not live.
    pub fn size(&self, arena: &EntityArena<A>, owner: EntityId) -> Result<usize, X> {
        Ok((self.read)(arena.entity(owner)?).size())
    }
}

impl<A, B, C, X> fmt::Debug for MultilinkDef<A, B, C, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultilinkDef")
            .field("name", &self.name)
            .field("reciprocal", &self.insert_reciprocal.is_some())
            .finish_non_exhaustive()
    }
}
