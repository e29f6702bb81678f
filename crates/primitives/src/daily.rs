//! Per-day aggregate and feature type definitions.

use serde::{Deserialize, Serialize};

use crate::{Date, EntityId};

/// Total spend of one entity on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Entity the total belongs to.
    pub entity_id: EntityId,
    /// Calendar day under the configured day convention.
    pub day: Date,
    /// Sum of event amounts on that day.
    pub total_amount: f64,
    /// Number of events that went into the total.
    pub event_count: usize,
}

impl DailyAggregate {
    /// Create a new daily aggregate.
    #[must_use]
    pub const fn new(entity_id: EntityId, day: Date, total_amount: f64, event_count: usize) -> Self {
        Self { entity_id, day, total_amount, event_count }
    }

    /// The (entity, day) key this row is unique on.
    #[must_use]
    pub const fn key(&self) -> (EntityId, Date) {
        (self.entity_id, self.day)
    }
}

/// Trailing-window mean of daily totals, one per daily aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowedFeature {
    /// Entity the feature belongs to.
    pub entity_id: EntityId,
    /// Day of the daily aggregate this feature was computed at.
    pub day: Date,
    /// Mean over the window.
    pub windowed_value: f64,
    /// Number of daily rows that fell inside the window.
    pub observations: usize,
}

impl WindowedFeature {
    /// Create a new windowed feature.
    #[must_use]
    pub const fn new(entity_id: EntityId, day: Date, windowed_value: f64, observations: usize) -> Self {
        Self { entity_id, day, windowed_value, observations }
    }
}

/// Number of trips across all entities on one day, with its moving average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTripCount {
    /// Calendar day.
    pub day: Date,
    /// Trips that started on that day.
    pub trips: usize,
    /// Row-window moving average, absent while the window is incomplete.
    pub moving_average: Option<f64>,
}
