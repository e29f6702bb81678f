//! Trip sources backed by polars frames.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use churnfeat_primitives::{GeoPoint, Timestamp, TripRecord};
use churnfeat_traits::{MemorySource, RecordBatch, SourceError, TripScan, TripSource};
use polars::prelude::*;
use tracing::{debug, info};

use crate::UtilsError;

/// Columns of the exported trip table.
pub const TRIP_COLUMNS: [&str; 7] = [
    "trip_id",
    "pickup_datetime",
    "pickup_longitude",
    "pickup_latitude",
    "dropoff_longitude",
    "dropoff_latitude",
    "total_amount",
];

/// Parse a pickup timestamp.
///
/// Accepts `%Y-%m-%d %H:%M:%S` with optional fractional seconds, the same
/// with a `T` separator, or RFC 3339. Zone-less values are read as UTC.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, UtilsError> {
    df.column(name).map_err(|_| UtilsError::MissingColumn(name.to_string()))
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, UtilsError> {
    let values = column(df, name)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().collect())
}

fn optional_float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, UtilsError> {
    if df.column(name).is_ok() { float_column(df, name) } else { Ok(vec![None; df.height()]) }
}

/// Convert a trip table into raw records.
///
/// `trip_id`, `pickup_datetime`, `total_amount` and the pickup coordinates
/// are required columns; the dropoff coordinates may be left out. Cells
/// that are null or fail to parse become `None` and are rejected later by
/// ingestion.
///
/// # Errors
/// Returns `UtilsError::MissingColumn` if a required column is absent.
pub fn trips_from_frame(df: &DataFrame) -> Result<Vec<TripRecord>, UtilsError> {
    let ids = column(df, "trip_id")?.cast(&DataType::String)?;
    let ids = ids.str()?;
    let pickup_at = column(df, "pickup_datetime")?.cast(&DataType::String)?;
    let pickup_at = pickup_at.str()?;
    let pickup_lon = float_column(df, "pickup_longitude")?;
    let pickup_lat = float_column(df, "pickup_latitude")?;
    let dropoff_lon = optional_float_column(df, "dropoff_longitude")?;
    let dropoff_lat = optional_float_column(df, "dropoff_latitude")?;
    let amounts = float_column(df, "total_amount")?;

    Ok(ids
        .into_iter()
        .zip(pickup_at)
        .enumerate()
        .map(|(i, (id, ts))| TripRecord {
            trip_id: id.map(str::to_string),
            pickup_at: ts.and_then(parse_timestamp),
            pickup: GeoPoint::from_parts(pickup_lon[i], pickup_lat[i]),
            dropoff: GeoPoint::from_parts(dropoff_lon[i], dropoff_lat[i]),
            amount: amounts[i],
        })
        .collect())
}

/// Read a trip table from CSV.
///
/// # Errors
/// Returns `UtilsError::Polars` if the file cannot be read or parsed.
pub fn read_trip_csv(path: impl AsRef<Path>) -> Result<DataFrame, UtilsError> {
    let path = path.as_ref();
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10_000))
        .finish()?
        .collect()?;
    info!(path = %path.display(), rows = df.height(), "read trip csv");
    Ok(df)
}

/// A trip source over a polars frame, scanned in row slices.
#[derive(Debug, Clone)]
pub struct FrameSource {
    name: String,
    frame: DataFrame,
    batch_size: usize,
}

impl FrameSource {
    /// Create a source over a frame.
    ///
    /// # Errors
    /// Returns `UtilsError::MissingColumn` if a required column is absent.
    pub fn new(name: impl Into<String>, frame: DataFrame) -> Result<Self, UtilsError> {
        for required in ["trip_id", "pickup_datetime", "pickup_longitude", "pickup_latitude", "total_amount"] {
            column(&frame, required)?;
        }
        Ok(Self { name: name.into(), frame, batch_size: MemorySource::DEFAULT_BATCH_SIZE })
    }

    /// Create a source over a CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or lacks a required column.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, UtilsError> {
        let path = path.as_ref();
        Self::new(path.display().to_string(), read_trip_csv(path)?)
    }

    /// Set the number of rows per batch.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Get the underlying frame.
    #[must_use]
    pub const fn frame(&self) -> &DataFrame {
        &self.frame
    }
}

impl TripSource for FrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<Box<dyn TripScan + '_>, SourceError> {
        debug!(source = %self.name, rows = self.frame.height(), "opened frame scan");
        Ok(Box::new(FrameScan { source: self, offset: 0 }))
    }
}

struct FrameScan<'a> {
    source: &'a FrameSource,
    offset: usize,
}

impl TripScan for FrameScan<'_> {
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        let height = self.source.frame.height();
        if self.offset >= height {
            return Ok(None);
        }
        let len = self.source.batch_size.min(height - self.offset);
        let slice = self.source.frame.slice(self.offset as i64, len);
        self.offset += len;
        Ok(Some(trips_from_frame(&slice)?))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::TimeZone;
    use churnfeat_traits::drain;

    use super::*;

    fn trips_frame() -> DataFrame {
        df! {
            "trip_id" => &[1_i64, 2, 3],
            "pickup_datetime" => &["2015-07-01 08:15:00", "2015-07-01T09:00:00Z", "garbage"],
            "pickup_longitude" => &[Some(-73.98), None, Some(-73.95)],
            "pickup_latitude" => &[40.75, 40.76, 40.77],
            "total_amount" => &[Some(12.5), Some(8.0), None],
        }
        .unwrap()
    }

    #[test]
    fn parses_timestamp_layouts() {
        let expected = Utc.with_ymd_and_hms(2015, 7, 1, 8, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2015-07-01 08:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2015-07-01T08:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2015-07-01T10:15:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("07/01/2015"), None);
    }

    #[test]
    fn frame_rows_become_records() {
        let records = trips_from_frame(&trips_frame()).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].trip_id.as_deref(), Some("1"));
        assert_eq!(records[0].pickup, Some(GeoPoint::new(-73.98, 40.75)));
        assert_eq!(records[0].dropoff, None);
        assert_eq!(records[1].pickup, None);
        assert!(records[1].pickup_at.is_some());
        assert_eq!(records[2].pickup_at, None);
        assert_eq!(records[2].amount, None);
    }

    #[test]
    fn missing_required_column() {
        let df = df! { "trip_id" => &[1_i64] }.unwrap();
        let err = FrameSource::new("bad", df).unwrap_err();
        assert!(matches!(err, UtilsError::MissingColumn(name) if name == "pickup_datetime"));
    }

    #[test]
    fn scans_in_batches() {
        let source = FrameSource::new("trips", trips_frame()).unwrap().with_batch_size(2);
        let mut scan = source.open().unwrap();

        assert_eq!(scan.next_batch().unwrap().map(|b| b.len()), Some(2));
        assert_eq!(scan.next_batch().unwrap().map(|b| b.len()), Some(1));
        assert!(scan.next_batch().unwrap().is_none());

        let mut again = source.open().unwrap();
        assert_eq!(drain(&mut *again).unwrap().len(), 3);
    }

    #[test]
    fn reads_csv_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", TRIP_COLUMNS.join(",")).unwrap();
        writeln!(file, "t1,2015-07-01 08:15:00,-73.98,40.75,-73.99,40.73,12.5").unwrap();
        writeln!(file, "t2,2015-07-02 10:00:00,-73.98,40.75,,,7.25").unwrap();
        file.flush().unwrap();

        let source = FrameSource::from_csv(file.path()).unwrap();
        let mut scan = source.open().unwrap();
        let records = drain(&mut *scan).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].dropoff, Some(GeoPoint::new(-73.99, 40.73)));
        assert_eq!(records[1].dropoff, None);
        assert_eq!(records[1].amount, Some(7.25));
    }
}
