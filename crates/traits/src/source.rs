//! Scan interface onto the external trip store.

use churnfeat_primitives::TripRecord;
use polars::prelude::PolarsError;

/// A batch of scanned trip rows.
pub type RecordBatch = Vec<TripRecord>;

/// Errors raised by a trip source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Polars error.
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    /// I/O error while reading the source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A column required by the trip layout is missing.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// Any other failure reported by the backing store.
    #[error("backend error: {0}")]
    Backend(String),
}

impl SourceError {
    /// Returns whether retrying the scan could succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Backend(_))
    }
}

/// An open scan over trip records.
///
/// The handle owns whatever session the store needs for the duration of the
/// scan; dropping it releases that session.
pub trait TripScan {
    /// Return the next batch, or `None` once the scan is exhausted.
    ///
    /// # Errors
    /// Returns `SourceError` if the store fails mid-scan.
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError>;
}

/// A store of trip records that can be scanned.
pub trait TripSource: Send + Sync {
    /// Human-readable name of the source, used in logs.
    fn name(&self) -> &str;

    /// Open a new scan.
    ///
    /// # Errors
    /// Returns `SourceError` if the store cannot be opened.
    fn open(&self) -> Result<Box<dyn TripScan + '_>, SourceError>;
}

/// Read every remaining batch of a scan into memory.
///
/// # Errors
/// Returns the first `SourceError` raised by the scan.
pub fn drain(scan: &mut (dyn TripScan + '_)) -> Result<Vec<TripRecord>, SourceError> {
    let mut records = Vec::new();
    while let Some(batch) = scan.next_batch()? {
        records.extend(batch);
    }
    Ok(records)
}

/// In-memory trip source handing out fixed-size batches.
#[derive(Debug, Clone)]
pub struct MemorySource {
    records: Vec<TripRecord>,
    batch_size: usize,
}

impl MemorySource {
    /// Default number of rows per batch.
    pub const DEFAULT_BATCH_SIZE: usize = 8192;

    /// Create a source over the given records.
    #[must_use]
    pub const fn new(records: Vec<TripRecord>) -> Self {
        Self { records, batch_size: Self::DEFAULT_BATCH_SIZE }
    }

    /// Set the batch size (clamped to at least one row).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Number of records held.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TripSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn open(&self) -> Result<Box<dyn TripScan + '_>, SourceError> {
        Ok(Box::new(MemoryScan { remaining: &self.records, batch_size: self.batch_size }))
    }
}

#[derive(Debug)]
struct MemoryScan<'a> {
    remaining: &'a [TripRecord],
    batch_size: usize,
}

impl TripScan for MemoryScan<'_> {
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, SourceError> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        let take = self.batch_size.min(self.remaining.len());
        let (batch, rest) = self.remaining.split_at(take);
        self.remaining = rest;
        Ok(Some(batch.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<TripRecord> {
        (0..n)
            .map(|i| TripRecord { trip_id: Some(i.to_string()), ..TripRecord::default() })
            .collect()
    }

    #[test]
    fn memory_scan_batches() {
        let source = MemorySource::new(records(5)).with_batch_size(2);
        let mut scan = source.open().unwrap();

        let sizes: Vec<usize> =
            std::iter::from_fn(|| scan.next_batch().unwrap()).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn drain_collects_all() {
        let source = MemorySource::new(records(7)).with_batch_size(3);
        let mut scan = source.open().unwrap();
        let all = drain(scan.as_mut()).unwrap();

        assert_eq!(all.len(), 7);
        assert_eq!(all[6].trip_id.as_deref(), Some("6"));
    }

    #[test]
    fn scans_restart_from_the_beginning() {
        let source = MemorySource::new(records(3));
        let first = drain(source.open().unwrap().as_mut()).unwrap();
        let second = drain(source.open().unwrap().as_mut()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn error_is_recoverable() {
        assert!(SourceError::Backend("timeout".to_string()).is_recoverable());
        assert!(!SourceError::MissingColumn("trip_id".to_string()).is_recoverable());
    }
}
