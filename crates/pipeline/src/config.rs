//! Pipeline configuration.

use std::path::Path;

use chrono::{FixedOffset, Offset, Utc};
use churnfeat_primitives::{Date, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{PipelineError, Result};

/// Largest supported rounding precision, in decimal places.
pub const MAX_KEY_PRECISION: u32 = 9;

/// Which location an entity key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationAnchor {
    /// Pickup coordinates.
    #[default]
    Pickup,
    /// Dropoff coordinates.
    Dropoff,
}

/// How entity keys are derived from event coordinates.
///
/// Coordinates are rounded to `precision` decimal places before hashing, so
/// every location inside the same rounding cell maps to the same entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityKeyConfig {
    /// Decimal places kept (3 places is roughly a 100 m cell).
    pub precision: u32,
    /// Location the key is derived from.
    pub anchor: LocationAnchor,
}

impl Default for EntityKeyConfig {
    fn default() -> Self {
        Self { precision: 3, anchor: LocationAnchor::Pickup }
    }
}

/// Day boundary convention.
///
/// Event instants are shifted by a fixed UTC offset and truncated to the date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DayConvention {
    /// Offset from UTC in minutes (0 means days start at 00:00 UTC).
    pub utc_offset_minutes: i32,
}

impl DayConvention {
    /// Days start at midnight UTC.
    pub const UTC: Self = Self { utc_offset_minutes: 0 };

    /// The offset as a chrono timezone; UTC if out of range.
    #[must_use]
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    /// Calendar day an instant falls on.
    #[must_use]
    pub fn day_of(&self, ts: &Timestamp) -> Date {
        ts.with_timezone(&self.offset()).date_naive()
    }

    fn validate(&self) -> Result<()> {
        if self.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(PipelineError::InvalidConfig(format!(
                "utc_offset_minutes {} is not within a day",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }
}

/// Window shape used by the trailing window aggregator.
///
/// The two modes are separate variants so a run never mixes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WindowSpec {
    /// Rows whose day lies in `[D - width, D]`; missing days are not rows.
    Days {
        /// Window width in days (2 gives a three-day window).
        width: u32,
    },
    /// The current row and `preceding` earlier rows. Dense series only.
    Rows {
        /// Number of preceding rows.
        preceding: usize,
    },
}

/// Treatment of days without activity inside a day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    /// Missing days contribute no term.
    #[default]
    Skip,
    /// Missing days count as zero spend.
    ZeroFill,
}

/// Trailing window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window shape.
    pub spec: WindowSpec,
    /// Gap treatment, only used by day windows.
    pub gap_policy: GapPolicy,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { spec: WindowSpec::Days { width: 2 }, gap_policy: GapPolicy::Skip }
    }
}

/// Label generation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Every entity crossed with every candidate date.
    #[default]
    Dense,
    /// Only (entity, date) pairs with activity.
    Sparse,
}

/// Candidate prediction dates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionSchedule {
    /// Every day that has at least one event.
    #[default]
    EventDays,
    /// An explicit list of dates.
    Explicit {
        /// Prediction dates.
        dates: Vec<Date>,
    },
}

/// Built-in labelling functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetSpec {
    /// The same value for every label.
    Constant {
        /// Target value.
        value: f64,
    },
    /// 1.0 when the entity has no activity in the outcome window, else 0.0.
    Inactivity,
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::Constant { value: 0.0 }
    }
}

/// Label generation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Dense or sparse labels.
    pub policy: LabelPolicy,
    /// Candidate prediction dates.
    pub schedule: PredictionSchedule,
    /// Labelling function.
    pub target: TargetSpec,
    /// Length of the outcome window in days.
    pub horizon_days: u32,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            policy: LabelPolicy::Dense,
            schedule: PredictionSchedule::EventDays,
            target: TargetSpec::default(),
            horizon_days: 7,
        }
    }
}

/// Handling of feature rows that share an (entity, day) key in the as-of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Abort the run.
    #[default]
    Reject,
    /// Keep the first row in input order and count the rest.
    FirstWins,
}

/// As-of join configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
    /// Duplicate feature handling.
    pub duplicates: DuplicatePolicy,
    /// Matches older than this many days are treated as absent.
    pub max_staleness_days: Option<u32>,
}

/// Daily trip trend configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Whether the trend table is produced.
    pub enabled: bool,
    /// Moving average window in rows.
    pub window: usize,
    /// Drop rows whose window is not yet full.
    pub drop_incomplete: bool,
    /// Insert zero-trip rows for days without trips. When off, a day
    /// without trips fails the run before any window is evaluated.
    pub fill_missing_days: bool,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { enabled: true, window: 7, drop_incomplete: true, fill_missing_days: true }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Entity key derivation.
    pub entity_key: EntityKeyConfig,
    /// Day boundary convention.
    pub day: DayConvention,
    /// Trailing window.
    pub window: WindowConfig,
    /// Labels.
    pub labels: LabelConfig,
    /// As-of join.
    pub join: JoinConfig,
    /// Daily trip trend.
    pub trend: TrendConfig,
    /// Run per-entity shards on the rayon pool.
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            entity_key: EntityKeyConfig::default(),
            day: DayConvention::UTC,
            window: WindowConfig::default(),
            labels: LabelConfig::default(),
            join: JoinConfig::default(),
            trend: TrendConfig::default(),
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing fields take defaults.
    ///
    /// # Errors
    /// Returns `PipelineError::Io` or `PipelineError::Json` if the file cannot
    /// be read or parsed, and `PipelineError::InvalidConfig` if it fails
    /// validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration from JSON text.
    ///
    /// # Errors
    /// Returns `PipelineError::Json` or `PipelineError::InvalidConfig`.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfig` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.entity_key.precision > MAX_KEY_PRECISION {
            return Err(PipelineError::InvalidConfig(format!(
                "entity key precision {} exceeds {MAX_KEY_PRECISION}",
                self.entity_key.precision
            )));
        }
        self.day.validate()?;
        if matches!(self.window.spec, WindowSpec::Rows { .. })
            && self.window.gap_policy == GapPolicy::ZeroFill
        {
            return Err(PipelineError::InvalidConfig(
                "zero_fill gap policy only applies to day windows".to_string(),
            ));
        }
        if let PredictionSchedule::Explicit { dates } = &self.labels.schedule
            && dates.is_empty()
        {
            return Err(PipelineError::InvalidConfig(
                "explicit prediction schedule has no dates".to_string(),
            ));
        }
        if self.labels.target == TargetSpec::Inactivity && self.labels.horizon_days == 0 {
            return Err(PipelineError::InvalidConfig(
                "inactivity target needs a horizon of at least one day".to_string(),
            ));
        }
        if self.trend.enabled && self.trend.window == 0 {
            return Err(PipelineError::InvalidConfig("trend window must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.spec, WindowSpec::Days { width: 2 });
        assert_eq!(config.entity_key.precision, 3);
        assert_eq!(config.trend.window, 7);
        assert!(config.trend.fill_missing_days);
    }

    #[test]
    fn parse_partial_json() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "window": { "spec": { "mode": "rows", "preceding": 6 } },
                "labels": { "policy": "sparse", "target": { "kind": "inactivity" } },
                "day": { "utc_offset_minutes": -300 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.window.spec, WindowSpec::Rows { preceding: 6 });
        assert_eq!(config.labels.policy, LabelPolicy::Sparse);
        assert_eq!(config.labels.target, TargetSpec::Inactivity);
        assert_eq!(config.labels.horizon_days, 7);
        assert_eq!(config.day.utc_offset_minutes, -300);
        assert!(config.parallel);
    }

    #[test]
    fn parse_explicit_schedule() {
        let config = PipelineConfig::from_json_str(
            r#"{ "labels": { "schedule": { "kind": "explicit", "dates": ["2015-07-05"] } } }"#,
        )
        .unwrap();
        let expected = vec![Date::from_ymd_opt(2015, 7, 5).unwrap()];
        assert_eq!(config.labels.schedule, PredictionSchedule::Explicit { dates: expected });
    }

    #[test]
    fn invalid_values_rejected() {
        let mut config = PipelineConfig::default();
        config.entity_key.precision = 12;
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));

        let mut config = PipelineConfig::default();
        config.window = WindowConfig {
            spec: WindowSpec::Rows { preceding: 6 },
            gap_policy: GapPolicy::ZeroFill,
        };
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.day.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.labels.schedule = PredictionSchedule::Explicit { dates: vec![] };
        assert!(config.validate().is_err());
    }

    #[test]
    fn day_convention_shifts_boundary() {
        let ts = Utc.with_ymd_and_hms(2015, 7, 2, 3, 30, 0).unwrap();
        assert_eq!(DayConvention::UTC.day_of(&ts), Date::from_ymd_opt(2015, 7, 2).unwrap());

        let new_york = DayConvention { utc_offset_minutes: -4 * 60 };
        assert_eq!(new_york.day_of(&ts), Date::from_ymd_opt(2015, 7, 1).unwrap());
    }
}
