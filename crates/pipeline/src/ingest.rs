//! Validation of scanned trip rows.

use std::collections::{BTreeMap, HashSet};

use churnfeat_primitives::{TripEvent, TripRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::PipelineError;

/// Why a record was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// A required field is missing or unparseable.
    MissingField(&'static str),
    /// The trip id was already seen earlier in the scan.
    DuplicateId,
    /// The location the entity key is derived from is missing.
    MissingLocation,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing or invalid {field}"),
            Self::DuplicateId => write!(f, "duplicate trip_id"),
            Self::MissingLocation => write!(f, "missing entity key location"),
        }
    }
}

/// A record that was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    /// Trip identifier, if the record had one.
    pub trip_id: Option<String>,
    /// Why it was skipped.
    pub reason: RejectReason,
}

impl RejectedRecord {
    /// Convert into the error kind it represents.
    #[must_use]
    pub fn into_error(self) -> PipelineError {
        PipelineError::MalformedInputRecord { trip_id: self.trip_id, reason: self.reason.to_string() }
    }
}

/// Records skipped during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectionLog {
    entries: Vec<RejectedRecord>,
}

impl RejectionLog {
    /// Create an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Record a skipped record.
    pub fn push(&mut self, trip_id: Option<String>, reason: RejectReason) {
        debug!(?trip_id, %reason, "rejected trip record");
        self.entries.push(RejectedRecord { trip_id, reason });
    }

    /// Append another log.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Number of skipped records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing was skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Skipped records in the order they were seen.
    #[must_use]
    pub fn entries(&self) -> &[RejectedRecord] {
        &self.entries
    }

    /// Count of skipped records per reason.
    #[must_use]
    pub fn by_reason(&self) -> BTreeMap<RejectReason, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.reason).or_insert(0) += 1;
        }
        counts
    }
}

/// Validated events and the records that did not make it.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    /// Valid events, in scan order.
    pub events: Vec<TripEvent>,
    /// Skipped records.
    pub rejected: RejectionLog,
}

/// Validate scanned rows into events.
///
/// Records missing an id, a timestamp or a finite amount are skipped, as is
/// any record whose id was already accepted.
#[must_use]
pub fn ingest(records: Vec<TripRecord>) -> Ingested {
    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Ingested { events: Vec::with_capacity(records.len()), ..Ingested::default() };

    for record in records {
        let trip_id = record.trip_id.clone();
        match record.validate() {
            Ok(event) => {
                if seen.insert(event.id.clone()) {
                    out.events.push(event);
                } else {
                    out.rejected.push(trip_id, RejectReason::DuplicateId);
                }
            }
            Err(field) => out.rejected.push(trip_id, RejectReason::MissingField(field)),
        }
    }

    if !out.rejected.is_empty() {
        warn!(
            accepted = out.events.len(),
            rejected = out.rejected.count(),
            "skipped malformed trip records"
        );
    }
    out
}
