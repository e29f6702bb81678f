//! Trailing window aggregator.

use churnfeat_math::{MathError, TrailingMean, Window, check_strictly_increasing, first_gap};
use churnfeat_primitives::{DailyAggregate, Date, EntityId, WindowedFeature};
use chrono::Datelike;

use crate::{GapPolicy, PipelineError, Result, WindowConfig, WindowSpec};

/// Ordinal used as the window key for a day.
pub(crate) fn day_key(day: Date) -> i64 {
    i64::from(day.num_days_from_ce())
}

/// Computes trailing means of daily totals, one feature per daily row.
#[derive(Debug, Clone)]
pub struct TrailingWindowAggregator {
    config: WindowConfig,
    kernel: TrailingMean,
}

impl TrailingWindowAggregator {
    /// Create an aggregator.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfig` for a zero-fill row window.
    pub fn new(config: WindowConfig) -> Result<Self> {
        let window = match (config.spec, config.gap_policy) {
            (WindowSpec::Days { width }, gap) => {
                Window::Span { width: i64::from(width), zero_fill: gap == GapPolicy::ZeroFill }
            }
            (WindowSpec::Rows { preceding }, GapPolicy::Skip) => Window::Rows { preceding },
            (WindowSpec::Rows { .. }, GapPolicy::ZeroFill) => {
                return Err(PipelineError::InvalidConfig(
                    "zero_fill gap policy only applies to day windows".to_string(),
                ));
            }
        };
        Ok(Self { config, kernel: TrailingMean::new(window)? })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Check one entity's series before any window is evaluated.
    ///
    /// Days must be strictly increasing, and a row window additionally
    /// needs a gap-free series.
    ///
    /// # Errors
    /// Returns `PipelineError::DuplicateAggregateKey`,
    /// `PipelineError::UnsortedSeries` or `PipelineError::WindowModeMismatch`.
    pub fn validate_series(&self, entity: EntityId, rows: &[DailyAggregate]) -> Result<()> {
        let keys: Vec<i64> = rows.iter().map(|r| day_key(r.day)).collect();
        check_strictly_increasing(&keys).map_err(|e| series_error(entity, rows, e))?;

        if matches!(self.config.spec, WindowSpec::Rows { .. })
            && let Some(index) = first_gap(&keys)
        {
            return Err(PipelineError::WindowModeMismatch {
                series: format!("entity {entity}"),
                previous: rows[index - 1].day,
                day: rows[index].day,
            });
        }
        Ok(())
    }

    /// Windowed features of one entity's series, sorted ascending by day.
    ///
    /// The feature at day `D` only reads rows with day `<= D`.
    ///
    /// # Errors
    /// Returns the errors of [`Self::validate_series`].
    pub fn apply_entity(
        &self,
        entity: EntityId,
        rows: &[DailyAggregate],
    ) -> Result<Vec<WindowedFeature>> {
        self.validate_series(entity, rows)?;
        self.evaluate(entity, rows)
    }

    /// Run the kernel over a series that already passed [`Self::validate_series`].
    pub(crate) fn evaluate(
        &self,
        entity: EntityId,
        rows: &[DailyAggregate],
    ) -> Result<Vec<WindowedFeature>> {
        let keys: Vec<i64> = rows.iter().map(|r| day_key(r.day)).collect();
        let values: Vec<f64> = rows.iter().map(|r| r.total_amount).collect();
        let points = self.kernel.apply(&keys, &values).map_err(|e| series_error(entity, rows, e))?;

        Ok(rows
            .iter()
            .zip(points)
            .map(|(row, p)| WindowedFeature::new(entity, row.day, p.mean, p.observations))
            .collect())
    }
}

fn series_error(entity: EntityId, rows: &[DailyAggregate], err: MathError) -> PipelineError {
    match err {
        MathError::DuplicateKey { index, .. } => {
            PipelineError::DuplicateAggregateKey { stage: "rollup", entity, day: rows[index].day }
        }
        MathError::UnsortedKeys { index, .. } => PipelineError::UnsortedSeries {
            entity,
            previous: rows[index - 1].day,
            day: rows[index].day,
        },
        MathError::GappedSeries { index, .. } => PipelineError::WindowModeMismatch {
            series: format!("entity {entity}"),
            previous: rows[index - 1].day,
            day: rows[index].day,
        },
        other => PipelineError::Math(other),
    }
}
