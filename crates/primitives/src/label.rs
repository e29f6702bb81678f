//! Label and training row type definitions.

use serde::{Deserialize, Serialize};

use crate::{Date, EntityId};

/// A churn label for one entity at one prediction date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Entity being labelled.
    pub entity_id: EntityId,
    /// Point in time the prediction is made at.
    pub prediction_date: Date,
    /// Target outcome.
    pub target: f64,
}

impl Label {
    /// Create a new label.
    #[must_use]
    pub const fn new(entity_id: EntityId, prediction_date: Date, target: f64) -> Self {
        Self { entity_id, prediction_date, target }
    }
}

/// Result of looking up a feature as of a prediction date.
///
/// `Absent` is a separate state: a missing feature is never reported as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AsOfValue {
    /// The most recent feature at or before the prediction date.
    Matched {
        /// Day of the matched feature row.
        feature_day: Date,
        /// Its windowed value.
        value: f64,
    },
    /// No feature row qualified.
    #[default]
    Absent,
}

impl AsOfValue {
    /// The matched value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Matched { value, .. } => Some(*value),
            Self::Absent => None,
        }
    }

    /// The day of the matched feature, if any.
    #[must_use]
    pub const fn feature_day(&self) -> Option<Date> {
        match self {
            Self::Matched { feature_day, .. } => Some(*feature_day),
            Self::Absent => None,
        }
    }

    /// Whether no feature qualified.
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// One row of the final training table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureTargetRow {
    /// Entity.
    pub entity_id: EntityId,
    /// Prediction date of the label.
    pub prediction_date: Date,
    /// Target outcome of the label.
    pub target: f64,
    /// Windowed feature as of the prediction date.
    pub feature: AsOfValue,
}

impl FeatureTargetRow {
    /// Attach an as-of feature to a label.
    #[must_use]
    pub const fn from_label(label: &Label, feature: AsOfValue) -> Self {
        Self {
            entity_id: label.entity_id,
            prediction_date: label.prediction_date,
            target: label.target,
            feature,
        }
    }

    /// The windowed value, absent when no feature qualified.
    #[must_use]
    pub const fn windowed_value(&self) -> Option<f64> {
        self.feature.value()
    }
}
