//! As-of feature joiner.
//!
//! Every label is paired with the most recent feature of the same entity
//! whose day is on or before the label's prediction date. Labels never
//! read a feature dated after the prediction date.

use std::collections::BTreeMap;

use churnfeat_primitives::{AsOfValue, Date, EntityId, FeatureTargetRow, Label, WindowedFeature};
use serde::Serialize;
use tracing::debug;

use crate::{DuplicatePolicy, JoinConfig, PipelineError, Result};

/// Join counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    /// Labels that found a feature.
    pub matched: usize,
    /// Labels with no feature on or before the prediction date.
    pub absent: usize,
    /// Labels whose latest feature was older than the staleness limit.
    pub stale: usize,
    /// Feature rows dropped as duplicates.
    pub duplicates_dropped: usize,
}

impl JoinReport {
    /// Add another report's counters.
    pub const fn merge(&mut self, other: Self) {
        self.matched += other.matched;
        self.absent += other.absent;
        self.stale += other.stale;
        self.duplicates_dropped += other.duplicates_dropped;
    }

    /// Total labels joined.
    #[must_use]
    pub const fn labels(&self) -> usize {
        self.matched + self.absent + self.stale
    }
}

/// One entity's features, sorted by day with unique days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedFeatures {
    rows: Vec<(Date, f64)>,
}

impl PreparedFeatures {
    /// Most recent row with day `<= date`.
    #[must_use]
    pub fn latest_at(&self, date: Date) -> Option<(Date, f64)> {
        let idx = self.rows.partition_point(|(day, _)| *day <= date);
        idx.checked_sub(1).map(|i| self.rows[i])
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Backward as-of join of labels against windowed features.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsOfJoiner {
    config: JoinConfig,
}

impl AsOfJoiner {
    /// Create a joiner.
    #[must_use]
    pub const fn new(config: JoinConfig) -> Self {
        Self { config }
    }

    /// Sort one entity's features by day and resolve duplicate days.
    ///
    /// The sort is stable, so under `FirstWins` the row that came first in
    /// the input survives. Returns the prepared series and how many rows
    /// were dropped.
    ///
    /// # Errors
    /// Returns `PipelineError::DuplicateAggregateKey` for a repeated day
    /// under `DuplicatePolicy::Reject`.
    pub fn prepare(
        &self,
        entity: EntityId,
        features: &[WindowedFeature],
    ) -> Result<(PreparedFeatures, usize)> {
        let mut rows: Vec<(Date, f64)> =
            features.iter().map(|f| (f.day, f.windowed_value)).collect();
        rows.sort_by_key(|(day, _)| *day);

        let before = rows.len();
        if self.config.duplicates == DuplicatePolicy::Reject
            && let Some(pair) = rows.windows(2).find(|w| w[0].0 == w[1].0)
        {
            return Err(PipelineError::DuplicateAggregateKey {
                stage: "feature",
                entity,
                day: pair[1].0,
            });
        }
        rows.dedup_by_key(|(day, _)| *day);

        let dropped = before - rows.len();
        if dropped > 0 {
            debug!(%entity, dropped, "dropped duplicate feature rows");
        }
        Ok((PreparedFeatures { rows }, dropped))
    }

    fn lookup(&self, prepared: &PreparedFeatures, label: &Label, report: &mut JoinReport) -> AsOfValue {
        let Some((feature_day, value)) = prepared.latest_at(label.prediction_date) else {
            report.absent += 1;
            return AsOfValue::Absent;
        };

        if let Some(limit) = self.config.max_staleness_days {
            let age = (label.prediction_date - feature_day).num_days();
            if age > i64::from(limit) {
                report.stale += 1;
                return AsOfValue::Absent;
            }
        }
        report.matched += 1;
        AsOfValue::Matched { feature_day, value }
    }

    /// Join the labels of one entity against that entity's features.
    ///
    /// Output has one row per label, in label order.
    ///
    /// # Errors
    /// Returns the errors of [`Self::prepare`].
    pub fn join_entity(
        &self,
        entity: EntityId,
        labels: &[Label],
        features: &[WindowedFeature],
    ) -> Result<(Vec<FeatureTargetRow>, JoinReport)> {
        let (prepared, dropped) = self.prepare(entity, features)?;
        let mut report = JoinReport { duplicates_dropped: dropped, ..JoinReport::default() };

        let rows = labels
            .iter()
            .map(|label| FeatureTargetRow::from_label(label, self.lookup(&prepared, label, &mut report)))
            .collect();
        Ok((rows, report))
    }

    /// Join labels of any number of entities.
    ///
    /// Neither input needs to be sorted. Output has one row per label, in
    /// label order.
    ///
    /// # Errors
    /// Returns the errors of [`Self::prepare`].
    pub fn join(
        &self,
        labels: &[Label],
        features: &[WindowedFeature],
    ) -> Result<(Vec<FeatureTargetRow>, JoinReport)> {
        let mut by_entity: BTreeMap<EntityId, Vec<WindowedFeature>> = BTreeMap::new();
        for feature in features {
            by_entity.entry(feature.entity_id).or_default().push(*feature);
        }

        let mut report = JoinReport::default();
        let mut prepared = BTreeMap::new();
        for (entity, rows) in &by_entity {
            let (series, dropped) = self.prepare(*entity, rows)?;
            report.duplicates_dropped += dropped;
            prepared.insert(*entity, series);
        }

        let empty = PreparedFeatures::default();
        let rows = labels
            .iter()
            .map(|label| {
                let series = prepared.get(&label.entity_id).unwrap_or(&empty);
                FeatureTargetRow::from_label(label, self.lookup(series, label, &mut report))
            })
            .collect();
        Ok((rows, report))
    }
}
