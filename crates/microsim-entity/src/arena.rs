//! Per-member entity storage.
//!
//! One [`EntityArena`] per entity type per simulated member owns every live
//! entity of that type. Relationships hold only [`EntityId`] keys into an
//! arena, never ownership. Alongside the live entities the arena keeps one
//! default-constructed *null entity*: following an unset or dangling link
//! resolves to it, so reads through an empty relationship yield default
//! values rather than failing.

use std::collections::BTreeMap;

use microsim_types::EntityId;
use tracing::debug;

use crate::error::EntityError;
use crate::link::Link;

/// Owner of all live entities of type `E` in one member.
#[derive(Debug, Clone)]
pub struct EntityArena<E> {
    member: u32,
    next_serial: u64,
    live: BTreeMap<EntityId, E>,
    null: E,
}

impl<E: Default> EntityArena<E> {
    /// Create an empty arena for `member`.
    pub fn new(member: u32) -> Self {
        Self::continue_from(member, 0)
    }

    /// Create an empty arena for `member` whose first id has serial
    /// `next_serial`.
    ///
    /// A member that builds a fresh arena per case passes the
    /// [`Self::next_serial`] of the previous arena, so ids never repeat
    /// within the member.
    pub fn continue_from(member: u32, next_serial: u64) -> Self {
        Self {
            member,
            next_serial,
            live: BTreeMap::new(),
            null: E::default(),
        }
    }
}

impl<E> EntityArena<E> {
    /// Add an entity and return its newly allocated id.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::IdSpaceExhausted`] if no id can be allocated.
    pub fn spawn(&mut self, entity: E) -> Result<EntityId, EntityError> {
        let member = self.member;
        let id = EntityId::from_parts(member, self.next_serial)
            .ok_or(EntityError::IdSpaceExhausted { member })?;
        self.next_serial = self
            .next_serial
            .checked_add(1)
            .ok_or(EntityError::IdSpaceExhausted { member })?;
        self.live.insert(id, entity);
        debug!(%id, live = self.live.len(), "Entity spawned");
        Ok(id)
    }

    /// Remove an entity, returning it if it was live.
    pub fn remove(&mut self, id: EntityId) -> Option<E> {
        let removed = self.live.remove(&id);
        if removed.is_some() {
            debug!(%id, live = self.live.len(), "Entity removed");
        }
        removed
    }

    /// Borrow a live entity.
    pub fn get(&self, id: EntityId) -> Option<&E> {
        self.live.get(&id)
    }

    /// Mutably borrow a live entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut E> {
        self.live.get_mut(&id)
    }

    /// Borrow a live entity or report it missing.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EntityNotFound`] if `id` is not live.
    pub fn entity(&self, id: EntityId) -> Result<&E, EntityError> {
        self.live.get(&id).ok_or(EntityError::EntityNotFound(id))
    }

    /// Mutably borrow a live entity or report it missing.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::EntityNotFound`] if `id` is not live.
    pub fn entity_mut(&mut self, id: EntityId) -> Result<&mut E, EntityError> {
        self.live.get_mut(&id).ok_or(EntityError::EntityNotFound(id))
    }

    /// Resolve an optional reference, falling back to the null entity.
    pub fn resolve(&self, target: Option<EntityId>) -> &E {
        target.and_then(|id| self.live.get(&id)).unwrap_or(&self.null)
    }

    /// Follow a link into this arena, falling back to the null entity.
    pub fn follow(&self, link: &Link<E>) -> &E {
        self.resolve(link.get())
    }

    /// The null entity.
    pub const fn null(&self) -> &E {
        &self.null
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: EntityId) -> bool {
        self.live.contains_key(&id)
    }

    /// Ids of all live entities in ascending order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.live.keys().copied().collect()
    }

    /// Iterate over live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &E)> {
        self.live.iter().map(|(id, e)| (*id, e))
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no entity is live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Member this arena belongs to.
    pub const fn member(&self) -> u32 {
        self.member
    }

    /// Serial the next spawned entity will receive.
    pub const fn next_serial(&self) -> u64 {
        self.next_serial
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;

    #[derive(Debug, Default)]
    struct Person {
        income: Attribute<f64>,
        spouse: Link<Person>,
    }

    #[test]
    fn spawned_ids_are_sequential_within_member() {
        let mut arena = EntityArena::<Person>::new(2);
        let a = arena.spawn(Person::default()).unwrap();
        let b = arena.spawn(Person::default()).unwrap();
        assert_eq!(a.member(), 2);
        assert_eq!(a.serial(), 0);
        assert_eq!(b.serial(), 1);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.ids(), vec![a, b]);
    }

    #[test]
    fn continued_arena_never_reuses_serials() {
        let mut first = EntityArena::<Person>::new(4);
        let a = first.spawn(Person::default()).unwrap();
        let b = first.spawn(Person::default()).unwrap();
        first.remove(a);
        first.remove(b);

        let mut second = EntityArena::<Person>::continue_from(4, first.next_serial());
        let c = second.spawn(Person::default()).unwrap();
        assert_eq!(c.serial(), 2);
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert_eq!(second.next_serial(), 3);
    }

    #[test]
    fn exhausted_serials_are_reported() {
        let mut arena = EntityArena::<Person>::continue_from(1, u64::MAX);
        assert_eq!(
            arena.spawn(Person::default()).err(),
            Some(EntityError::IdSpaceExhausted { member: 1 })
        );
        assert!(arena.is_empty());
    }

    #[test]
    fn empty_link_resolves_to_null_entity() {
        let mut arena = EntityArena::<Person>::new(0);
        let single = Person {
            income: Attribute::new(50.0),
            spouse: Link::empty(),
        };
        let id = arena.spawn(single).unwrap();
        let person = arena.entity(id).unwrap();
        let spouse_income = arena.follow(&person.spouse).income.get();
        assert!(spouse_income.abs() < f64::EPSILON);
    }

    #[test]
    fn dangling_link_resolves_to_null_entity() {
        let mut arena = EntityArena::<Person>::new(0);
        let earner = Person {
            income: Attribute::new(10.0),
            spouse: Link::empty(),
        };
        let gone = arena.spawn(earner).unwrap();
        let link = Link::<Person>::to(gone);
        assert!((arena.follow(&link).income.get() - 10.0).abs() < f64::EPSILON);
        assert!(arena.remove(gone).is_some());
        assert!(arena.follow(&link).income.get().abs() < f64::EPSILON);
        assert!(arena.remove(gone).is_none());
    }

    #[test]
    fn missing_entity_is_reported() {
        let mut arena = EntityArena::<Person>::new(0);
        let id = arena.spawn(Person::default()).unwrap();
        arena.remove(id);
        assert_eq!(arena.entity(id).err(), Some(EntityError::EntityNotFound(id)));
        assert!(arena.entity_mut(id).is_err());
        assert!(!arena.contains(id));
        assert!(arena.is_empty());
    }
}
