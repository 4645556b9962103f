//! Ordered sets of entities.
//!
//! An [`EntitySet`] collects the ids of entities that currently satisfy
//! some membership condition (alive, in a region, fertile). Members are
//! kept in ascending id order, so positional access and random selection
//! are deterministic for a given membership history. Model code keeps a
//! set current by calling [`EntitySet::update`] whenever the condition
//! may have changed.

use std::collections::BTreeSet;

use microsim_types::EntityId;
use serde::{Deserialize, Serialize};

/// Entities satisfying a condition, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySet {
    members: BTreeSet<EntityId>,
}

impl EntitySet {
    /// Empty set.
    pub const fn new() -> Self {
        Self {
            members: BTreeSet::new(),
        }
    }

    /// Add `id`. Returns `false` if it was already a member.
    pub fn insert(&mut self, id: EntityId) -> bool {
        self.members.insert(id)
    }

    /// Remove `id`. Returns `false` if it was not a member.
    pub fn remove(&mut self, id: EntityId) -> bool {
        self.members.remove(&id)
    }

    /// Make `id` a member exactly when `condition` holds.
    pub fn update(&mut self, id: EntityId, condition: bool) {
        if condition {
            self.members.insert(id);
        } else {
            self.members.remove(&id);
        }
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    /// Number of members.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member at zero-based position `index` in id order.
    pub fn item(&self, index: usize) -> Option<EntityId> {
        self.members.iter().nth(index).copied()
    }

    /// Member selected by a uniform draw in `[0, 1)`.
    ///
    /// The draw is scaled by the member count and truncated to a position.
    /// Returns `None` for an empty set or a draw outside `[0, 1)`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn get_random(&self, uniform: f64) -> Option<EntityId> {
        if !(0.0..1.0).contains(&uniform) {
            return None;
        }
        let last = self.members.len().checked_sub(1)?;
        let index = (uniform * self.members.len() as f64) as usize;
        self.item(index.min(last))
    }

    /// Members in ascending id order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = EntityId> {
        self.members.iter().copied()
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.members.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(serial: u64) -> EntityId {
        EntityId::from_parts(0, serial).unwrap()
    }

    fn set(serials: &[u64]) -> EntitySet {
        let mut set = EntitySet::new();
        for &serial in serials {
            set.insert(id(serial));
        }
        set
    }

    #[test]
    fn members_are_ordered_by_id() {
        let set = set(&[7, 2, 9, 4]);
        assert_eq!(set.count(), 4);
        assert_eq!(set.item(0), Some(id(2)));
        assert_eq!(set.item(3), Some(id(9)));
        assert_eq!(set.item(4), None);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![id(2), id(4), id(7), id(9)]);
    }

    #[test]
    fn insert_and_remove_report_membership_changes() {
        let mut set = EntitySet::new();
        assert!(set.insert(id(1)));
        assert!(!set.insert(id(1)));
        assert!(set.contains(id(1)));
        assert!(set.remove(id(1)));
        assert!(!set.remove(id(1)));
        assert!(set.is_empty());
    }

    #[test]
    fn update_follows_the_condition() {
        let mut set = EntitySet::new();
        set.update(id(3), true);
        set.update(id(3), true);
        assert_eq!(set.count(), 1);
        set.update(id(3), false);
        assert!(!set.contains(id(3)));
        set.update(id(5), false);
        assert!(set.is_empty());
    }

    #[test]
    fn random_member_scales_uniform_by_count() {
        let set = set(&[10, 20, 30, 40]);
        assert_eq!(set.get_random(0.0), Some(id(10)));
        assert_eq!(set.get_random(0.24), Some(id(10)));
        assert_eq!(set.get_random(0.25), Some(id(20)));
        assert_eq!(set.get_random(0.6), Some(id(30)));
        assert_eq!(set.get_random(0.999_999), Some(id(40)));
    }

    #[test]
    fn random_member_of_empty_set_or_bad_draw_is_none() {
        assert_eq!(EntitySet::new().get_random(0.5), None);
        let set = set(&[1]);
        assert_eq!(set.get_random(1.0), None);
        assert_eq!(set.get_random(-0.1), None);
        assert_eq!(set.get_random(f64::NAN), None);
    }

    #[test]
    fn set_survives_json() {
        let set = set(&[5, 1]);
        let json = serde_json::to_string(&set).unwrap();
        let back: EntitySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.item(0), Some(id(1)));
    }
}
