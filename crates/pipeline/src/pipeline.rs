//! End-to-end feature pipeline.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use churnfeat_primitives::{
    DailyAggregate, DailyTripCount, Date, EntityHistory, EntityId, FeatureTargetRow, Label,
    TripRecord, WindowedFeature,
};
use churnfeat_traits::{TargetFn, TripSource, drain};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, info_span};

use crate::{
    ActivityIndex, AsOfJoiner, ConstantTarget, DailyRollup, EntityKeyer, EventIndex,
    HistoryBuild, InactivityChurn, Ingested, JoinReport, LabelGenerator, PipelineConfig,
    PredictionSchedule, RejectionLog, Result, TargetSpec, TrailingWindowAggregator,
    build_histories, ingest, trip_trend,
};

/// Counters of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Records read from the source.
    pub scanned: usize,
    /// Records that became events.
    pub accepted: usize,
    /// Records and events that were skipped.
    pub rejected: RejectionLog,
    /// Distinct entities.
    pub entities: usize,
    /// Daily aggregate rows.
    pub daily_rows: usize,
    /// Windowed feature rows.
    pub feature_rows: usize,
    /// Label rows.
    pub label_rows: usize,
    /// Labels matched to a feature.
    pub matched: usize,
    /// Labels with no feature on or before the prediction date.
    pub absent: usize,
    /// Labels whose latest feature was too old.
    pub stale: usize,
    /// Feature rows dropped as duplicates in the join.
    pub duplicates_dropped: usize,
}

/// Every table a run produces.
///
/// Only built when every stage succeeded.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    /// Entity histories, ordered by entity.
    pub histories: BTreeMap<EntityId, EntityHistory>,
    /// Daily aggregates, ordered by (entity, day).
    pub daily: Vec<DailyAggregate>,
    /// Windowed features, ordered by (entity, day).
    pub features: Vec<WindowedFeature>,
    /// Labels, ordered by (entity, prediction date).
    pub labels: Vec<Label>,
    /// Training rows, one per label, in label order.
    pub training: Vec<FeatureTargetRow>,
    /// Global daily trip trend, when enabled.
    pub trend: Option<Vec<DailyTripCount>>,
    /// Run counters.
    pub report: RunReport,
}

struct Shard {
    entity: EntityId,
    daily: Vec<DailyAggregate>,
    active: BTreeSet<Date>,
}

struct ShardOutput {
    features: Vec<WindowedFeature>,
    training: Vec<FeatureTargetRow>,
    join: JoinReport,
}

/// Runs every stage from raw trips to the training table.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    config: PipelineConfig,
    aggregator: TrailingWindowAggregator,
}

impl FeaturePipeline {
    /// Create a pipeline.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let aggregator = TrailingWindowAggregator::new(config.window)?;
        Ok(Self { config, aggregator })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on a trip source, with the configured target function.
    ///
    /// # Errors
    /// Returns the first fatal error of any stage.
    pub fn run(&self, source: &dyn TripSource) -> Result<PipelineOutput> {
        let records = self.scan(source)?;
        self.execute(records, None)
    }

    /// Run on a trip source with a caller-supplied target function.
    ///
    /// # Errors
    /// Returns the first fatal error of any stage.
    pub fn run_with_target(
        &self,
        source: &dyn TripSource,
        target: &dyn TargetFn,
    ) -> Result<PipelineOutput> {
        let records = self.scan(source)?;
        self.execute(records, Some(target))
    }

    /// Run on records that are already in memory.
    ///
    /// # Errors
    /// Returns the first fatal error of any stage.
    pub fn run_records(&self, records: Vec<TripRecord>) -> Result<PipelineOutput> {
        self.execute(records, None)
    }

    fn scan(&self, source: &dyn TripSource) -> Result<Vec<TripRecord>> {
        let _span = info_span!("scan", source = source.name()).entered();
        // the scan handle is released before any stage runs
        let records = {
            let mut scan = source.open()?;
            drain(&mut *scan)?
        };
        info!(records = records.len(), "scanned trip source");
        Ok(records)
    }

    fn map_shards<T, U, F>(&self, items: &[T], f: F) -> Result<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> Result<U> + Sync + Send,
    {
        if self.config.parallel {
            items.par_iter().map(f).collect()
        } else {
            items.iter().map(f).collect()
        }
    }

    fn candidate_dates(&self, activity: &ActivityIndex) -> Vec<Date> {
        match &self.config.labels.schedule {
            PredictionSchedule::EventDays => activity.all_days(),
            PredictionSchedule::Explicit { dates } => {
                let dates: BTreeSet<Date> = dates.iter().copied().collect();
                dates.into_iter().collect()
            }
        }
    }

    fn execute(
        &self,
        records: Vec<TripRecord>,
        target: Option<&dyn TargetFn>,
    ) -> Result<PipelineOutput> {
        let _span = info_span!("pipeline").entered();
        let scanned = records.len();

        let Ingested { events, mut rejected } = ingest(records);
        let keyer = EntityKeyer::new(self.config.entity_key);
        let HistoryBuild { histories, rejected: unkeyed } = build_histories(&events, &keyer);
        rejected.extend(unkeyed);

        let index = EventIndex::new(&events);
        let rollup = DailyRollup::new(self.config.day);
        let entities: Vec<&EntityHistory> = histories.values().collect();
        let shards = self.map_shards(&entities, |history| {
            let daily = rollup.rollup_entity(history, &index)?;
            let active = daily.iter().map(|row| row.day).collect();
            Ok(Shard { entity: history.entity_id, daily, active })
        })?;
        info!(entities = shards.len(), "rolled up daily totals");

        // every series is checked before any window is evaluated
        for shard in &shards {
            self.aggregator.validate_series(shard.entity, &shard.daily)?;
        }
        let trend = if self.config.trend.enabled {
            Some(trip_trend(&events, &self.config.day, &self.config.trend)?)
        } else {
            None
        };

        let mut activity = ActivityIndex::new();
        for shard in &shards {
            activity.insert(shard.entity, shard.active.clone());
        }
        let activity = Arc::new(activity);
        let candidates = self.candidate_dates(&activity);

        let configured: Box<dyn TargetFn> = match self.config.labels.target {
            TargetSpec::Constant { value } => Box::new(ConstantTarget::new(value)),
            TargetSpec::Inactivity => Box::new(InactivityChurn::new(Arc::clone(&activity))),
        };
        let target: &dyn TargetFn = match target {
            Some(target) => target,
            None => configured.as_ref(),
        };
        let generator = LabelGenerator::new(
            self.config.labels.policy,
            self.config.labels.horizon_days,
            target,
        );
        let joiner = AsOfJoiner::new(self.config.join);
        info!(
            candidates = candidates.len(),
            policy = ?generator.policy(),
            target = target.name(),
            "generating labels"
        );

        let labels = generator.generate(&activity, &candidates);
        let mut labels_by_entity: BTreeMap<EntityId, &[Label]> = BTreeMap::new();
        for chunk in labels.chunk_by(|a, b| a.entity_id == b.entity_id) {
            labels_by_entity.insert(chunk[0].entity_id, chunk);
        }

        let outputs = self.map_shards(&shards, |shard| {
            let features = self.aggregator.evaluate(shard.entity, &shard.daily)?;
            let labels = labels_by_entity.get(&shard.entity).copied().unwrap_or_default();
            let (training, join) = joiner.join_entity(shard.entity, labels, &features)?;
            debug!(entity = %shard.entity, features = features.len(), labels = labels.len(), "joined shard");
            Ok(ShardOutput { features, training, join })
        })?;

        let mut output = PipelineOutput {
            trend,
            report: RunReport {
                scanned,
                accepted: events.len(),
                entities: histories.len(),
                ..RunReport::default()
            },
            ..PipelineOutput::default()
        };
        let mut join = JoinReport::default();
        for (shard, out) in shards.into_iter().zip(outputs) {
            output.daily.extend(shard.daily);
            output.features.extend(out.features);
            output.training.extend(out.training);
            join.merge(out.join);
        }

        output.labels = labels;
        output.report.rejected = rejected;
        output.report.daily_rows = output.daily.len();
        output.report.feature_rows = output.features.len();
        output.report.label_rows = output.labels.len();
        output.report.matched = join.matched;
        output.report.absent = join.absent;
        output.report.stale = join.stale;
        output.report.duplicates_dropped = join.duplicates_dropped;
        output.histories = histories;

        info!(
            entities = output.report.entities,
            features = output.report.feature_rows,
            labels = output.report.label_rows,
            matched = output.report.matched,
            absent = output.report.absent,
            rejected = output.report.rejected.count(),
            "pipeline finished"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use churnfeat_primitives::GeoPoint;
    use churnfeat_traits::MemorySource;

    use super::*;
    use crate::{LabelPolicy, PipelineError, WindowSpec};

    fn record(id: &str, lon: f64, day: u32, amount: f64) -> TripRecord {
        TripRecord {
            trip_id: Some(id.to_string()),
            pickup_at: Utc.with_ymd_and_hms(2015, 7, day, 9, 30, 0).single(),
            pickup: Some(GeoPoint::new(lon, 40.75)),
            dropoff: None,
            amount: Some(amount),
        }
    }

    fn records() -> Vec<TripRecord> {
        vec![
            record("1", -73.98, 1, 10.0),
            record("2", -73.98, 2, 20.0),
            record("3", -73.98, 4, 30.0),
            record("4", -73.90, 3, 8.0),
            TripRecord { trip_id: Some("5".to_string()), ..TripRecord::default() },
        ]
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let parallel = FeaturePipeline::new(PipelineConfig::default()).unwrap();
        let sequential =
            FeaturePipeline::new(PipelineConfig { parallel: false, ..PipelineConfig::default() })
                .unwrap();

        let a = parallel.run_records(records()).unwrap();
        let b = sequential.run_records(records()).unwrap();
        assert_eq!(a.daily, b.daily);
        assert_eq!(a.features, b.features);
        assert_eq!(a.training, b.training);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn report_counts() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
        let out = pipeline.run(&MemorySource::new(records())).unwrap();

        assert_eq!(out.report.scanned, 5);
        assert_eq!(out.report.accepted, 4);
        assert_eq!(out.report.rejected.count(), 1);
        assert_eq!(out.report.entities, 2);
        assert_eq!(out.report.daily_rows, 4);
        assert_eq!(out.report.feature_rows, out.report.daily_rows);
        // dense: 2 entities x 4 event days
        assert_eq!(out.report.label_rows, 8);
        assert_eq!(out.training.len(), out.labels.len());
        assert_eq!(out.report.matched + out.report.absent, 8);
    }

    #[test]
    fn sparse_policy_labels_active_days_only() {
        let mut config = PipelineConfig::default();
        config.labels.policy = LabelPolicy::Sparse;
        let out = FeaturePipeline::new(config).unwrap().run_records(records()).unwrap();

        assert_eq!(out.labels.len(), 4);
        assert_eq!(out.report.absent, 0);
    }

    #[test]
    fn row_window_over_gap_fails_whole_run() {
        let mut config = PipelineConfig::default();
        config.window.spec = WindowSpec::Rows { preceding: 2 };
        let err = FeaturePipeline::new(config).unwrap().run_records(records()).unwrap_err();
        assert!(matches!(err, PipelineError::WindowModeMismatch { .. }));
    }

    #[test]
    fn caller_target_overrides_config() {
        let pipeline = FeaturePipeline::new(PipelineConfig::default()).unwrap();
        let target = ConstantTarget::new(1.0);
        let out =
            pipeline.run_with_target(&MemorySource::new(records()), &target).unwrap();
        assert!(out.labels.iter().all(|l| l.target == 1.0));
    }

    #[test]
    fn trend_disabled() {
        let mut config = PipelineConfig::default();
        config.trend.enabled = false;
        let out = FeaturePipeline::new(config).unwrap().run_records(records()).unwrap();
        assert!(out.trend.is_none());
    }
}
