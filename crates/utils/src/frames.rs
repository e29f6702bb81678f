//! Output tables as polars frames.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::Datelike;
use churnfeat_primitives::{
    DailyAggregate, DailyTripCount, Date, EntityHistory, EntityId, FeatureTargetRow, Label,
    WindowedFeature,
};
use polars::prelude::*;
use tracing::info;

use crate::UtilsError;

/// Days from 1970-01-01 to 0001-01-01 in the proleptic Gregorian calendar.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn epoch_days(day: Date) -> i32 {
    day.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

fn date_column(name: &str, days: impl IntoIterator<Item = Option<Date>>) -> PolarsResult<Column> {
    let days: Vec<Option<i32>> = days.into_iter().map(|d| d.map(epoch_days)).collect();
    Ok(Series::new(name.into(), days).cast(&DataType::Date)?.into())
}

fn entity_column<'a>(ids: impl IntoIterator<Item = &'a EntityId>) -> Column {
    let ids: Vec<u64> = ids.into_iter().map(|id| id.get()).collect();
    Series::new("entity_id".into(), ids).into()
}

/// One row per (entity, trip).
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn histories_to_frame(
    histories: &BTreeMap<EntityId, EntityHistory>,
) -> Result<DataFrame, UtilsError> {
    let mut entities = Vec::new();
    let mut trips = Vec::new();
    for history in histories.values() {
        for event in &history.event_ids {
            entities.push(history.entity_id);
            trips.push(event.as_str());
        }
    }
    Ok(DataFrame::new(vec![
        entity_column(&entities),
        Series::new("trip_id".into(), trips).into(),
    ])?)
}

/// Daily aggregates.
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn daily_to_frame(rows: &[DailyAggregate]) -> Result<DataFrame, UtilsError> {
    Ok(DataFrame::new(vec![
        entity_column(rows.iter().map(|r| &r.entity_id)),
        date_column("day", rows.iter().map(|r| Some(r.day)))?,
        Series::new("total_amount".into(), rows.iter().map(|r| r.total_amount).collect::<Vec<_>>())
            .into(),
        Series::new(
            "event_count".into(),
            rows.iter().map(|r| r.event_count as u64).collect::<Vec<_>>(),
        )
        .into(),
    ])?)
}

/// Windowed features.
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn features_to_frame(rows: &[WindowedFeature]) -> Result<DataFrame, UtilsError> {
    Ok(DataFrame::new(vec![
        entity_column(rows.iter().map(|r| &r.entity_id)),
        date_column("day", rows.iter().map(|r| Some(r.day)))?,
        Series::new(
            "windowed_value".into(),
            rows.iter().map(|r| r.windowed_value).collect::<Vec<_>>(),
        )
        .into(),
        Series::new(
            "observations".into(),
            rows.iter().map(|r| r.observations as u64).collect::<Vec<_>>(),
        )
        .into(),
    ])?)
}

/// Labels.
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn labels_to_frame(rows: &[Label]) -> Result<DataFrame, UtilsError> {
    Ok(DataFrame::new(vec![
        entity_column(rows.iter().map(|r| &r.entity_id)),
        date_column("prediction_date", rows.iter().map(|r| Some(r.prediction_date)))?,
        Series::new("target".into(), rows.iter().map(|r| r.target).collect::<Vec<_>>()).into(),
    ])?)
}

/// The training table.
///
/// An absent as-of feature is a null `feature_day` and `windowed_value`.
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn training_to_frame(rows: &[FeatureTargetRow]) -> Result<DataFrame, UtilsError> {
    Ok(DataFrame::new(vec![
        entity_column(rows.iter().map(|r| &r.entity_id)),
        date_column("prediction_date", rows.iter().map(|r| Some(r.prediction_date)))?,
        Series::new("target".into(), rows.iter().map(|r| r.target).collect::<Vec<_>>()).into(),
        date_column("feature_day", rows.iter().map(|r| r.feature.feature_day()))?,
        Series::new(
            "windowed_value".into(),
            rows.iter().map(FeatureTargetRow::windowed_value).collect::<Vec<_>>(),
        )
        .into(),
    ])?)
}

/// The daily trip trend.
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn trend_to_frame(rows: &[DailyTripCount]) -> Result<DataFrame, UtilsError> {
    Ok(DataFrame::new(vec![
        date_column("day", rows.iter().map(|r| Some(r.day)))?,
        Series::new("trips".into(), rows.iter().map(|r| r.trips as u64).collect::<Vec<_>>())
            .into(),
        Series::new(
            "moving_average".into(),
            rows.iter().map(|r| r.moving_average).collect::<Vec<_>>(),
        )
        .into(),
    ])?)
}

/// Skipped records and why, as `(trip_id, reason)` rows.
///
/// # Errors
/// Returns `UtilsError::Polars` if the frame cannot be built.
pub fn rejections_to_frame<'a>(
    rows: impl IntoIterator<Item = (Option<&'a str>, String)>,
) -> Result<DataFrame, UtilsError> {
    let (trip_ids, reasons): (Vec<Option<&str>>, Vec<String>) = rows.into_iter().unzip();
    Ok(DataFrame::new(vec![
        Series::new("trip_id".into(), trip_ids).into(),
        Series::new("reason".into(), reasons).into(),
    ])?)
}

/// Write a frame as CSV with a header row.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<(), UtilsError> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!(rows = df.height(), path = %path.display(), "wrote table");
    Ok(())
}
