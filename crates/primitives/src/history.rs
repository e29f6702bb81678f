//! Entity history type definitions.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{EntityId, EventId};

/// The events attributed to one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityHistory {
    /// Entity.
    pub entity_id: EntityId,
    /// Events whose entity key resolved to `entity_id`.
    pub event_ids: BTreeSet<EventId>,
}

impl EntityHistory {
    /// Create an empty history.
    #[must_use]
    pub const fn new(entity_id: EntityId) -> Self {
        Self { entity_id, event_ids: BTreeSet::new() }
    }

    /// Add an event, returning false if it was already present.
    pub fn insert(&mut self, id: EventId) -> bool {
        self.event_ids.insert(id)
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.event_ids.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.event_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates() {
        let mut history = EntityHistory::new(EntityId::new(4));
        assert!(history.insert("a".into()));
        assert!(history.insert("b".into()));
        assert!(!history.insert("a".into()));
        assert_eq!(history.len(), 2);
    }
}
