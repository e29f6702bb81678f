//! Daily rollup aggregator.

use std::collections::{BTreeMap, HashMap};

use churnfeat_primitives::{DailyAggregate, Date, EntityHistory, EventId, TripEvent};

use crate::{DayConvention, PipelineError, Result};

/// Lookup of events by id.
#[derive(Debug, Clone, Default)]
pub struct EventIndex<'a> {
    by_id: HashMap<&'a EventId, &'a TripEvent>,
}

impl<'a> EventIndex<'a> {
    /// Index a slice of events. Later duplicates of an id are ignored.
    #[must_use]
    pub fn new(events: &'a [TripEvent]) -> Self {
        let mut by_id = HashMap::with_capacity(events.len());
        for event in events {
            by_id.entry(&event.id).or_insert(event);
        }
        Self { by_id }
    }

    /// Look up an event.
    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&'a TripEvent> {
        self.by_id.get(id).copied()
    }

    /// Number of indexed events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Sums event amounts per entity and calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyRollup {
    day: DayConvention,
}

impl DailyRollup {
    /// Create a rollup using the given day convention.
    #[must_use]
    pub const fn new(day: DayConvention) -> Self {
        Self { day }
    }

    /// Get the day convention.
    #[must_use]
    pub const fn day_convention(&self) -> &DayConvention {
        &self.day
    }

    fn events_of<'a>(
        &self,
        history: &'a EntityHistory,
        index: &'a EventIndex<'a>,
    ) -> impl Iterator<Item = Result<&'a TripEvent>> + 'a {
        let entity = history.entity_id;
        history.event_ids.iter().map(move |id| {
            index
                .get(id)
                .ok_or_else(|| PipelineError::UnknownEvent { entity, event: id.clone() })
        })
    }

    /// Daily totals of one entity, ascending by day.
    ///
    /// Days without events produce no row.
    ///
    /// # Errors
    /// Returns `PipelineError::UnknownEvent` if the history references an
    /// event missing from `index`.
    pub fn rollup_entity(
        &self,
        history: &EntityHistory,
        index: &EventIndex<'_>,
    ) -> Result<Vec<DailyAggregate>> {
        let mut by_day: BTreeMap<Date, (f64, usize)> = BTreeMap::new();
        for event in self.events_of(history, index) {
            let event = event?;
            let slot = by_day.entry(self.day.day_of(&event.pickup_at)).or_insert((0.0, 0));
            slot.0 += event.amount;
            slot.1 += 1;
        }

        Ok(by_day
            .into_iter()
            .map(|(day, (total, count))| DailyAggregate::new(history.entity_id, day, total, count))
            .collect())
    }
}
