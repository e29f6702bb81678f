//! Error types for the feature pipeline.

use churnfeat_math::MathError;
use churnfeat_primitives::{Date, EntityId, EventId};
use churnfeat_traits::SourceError;

/// Errors that can occur while running the feature pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A scanned record is missing a required field.
    ///
    /// Recovered by skipping the record; surfaced through the run report.
    #[error("malformed input record {trip_id:?}: {reason}")]
    MalformedInputRecord {
        /// Trip identifier, if the record had one.
        trip_id: Option<String>,
        /// What was wrong with it.
        reason: String,
    },

    /// The same (entity, day) key appeared twice.
    #[error("duplicate {stage} key for entity {entity} on {day}")]
    DuplicateAggregateKey {
        /// Stage that detected the duplicate.
        stage: &'static str,
        /// Entity.
        entity: EntityId,
        /// Repeated day.
        day: Date,
    },

    /// A row-count window was requested over a series with missing days.
    #[error("row window over gapped series {series}: {day} follows {previous}")]
    WindowModeMismatch {
        /// Series that has the gap.
        series: String,
        /// Day before the gap.
        previous: Date,
        /// Day after the gap.
        day: Date,
    },

    /// A per-entity series is not sorted by day.
    #[error("series for entity {entity} is not sorted: {day} follows {previous}")]
    UnsortedSeries {
        /// Entity.
        entity: EntityId,
        /// Day of the previous row.
        previous: Date,
        /// Day of the offending row.
        day: Date,
    },

    /// A history references an event missing from the event table.
    #[error("entity {entity} references unknown event {event}")]
    UnknownEvent {
        /// Entity.
        entity: EntityId,
        /// Missing event.
        event: EventId,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Trip source error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Window kernel error.
    #[error("math error: {0}")]
    Math(#[from] MathError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parsing error.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Returns whether the run can continue past this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedInputRecord { .. })
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let day = Date::from_ymd_opt(2015, 7, 3).unwrap();
        let err = PipelineError::DuplicateAggregateKey {
            stage: "rollup",
            entity: EntityId::new(12),
            day,
        };
        assert_eq!(err.to_string(), "duplicate rollup key for entity 12 on 2015-07-03");
    }

    #[test]
    fn error_is_recoverable() {
        let err = PipelineError::MalformedInputRecord {
            trip_id: None,
            reason: "missing trip_id".to_string(),
        };
        assert!(err.is_recoverable());

        let err = PipelineError::InvalidConfig("test".to_string());
        assert!(!err.is_recoverable());
    }
}
