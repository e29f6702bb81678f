//! Entity history builder.
//!
//! An entity is a rounding cell of the anchor location. Rounding is
//! deliberately lossy: nearby pickups collapse onto one entity id.

use std::collections::BTreeMap;

use churnfeat_primitives::{EntityHistory, EntityId, GeoPoint, TripEvent};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::{EntityKeyConfig, LocationAnchor, RejectReason, RejectionLog};

/// Derives entity ids from event locations.
#[derive(Debug, Clone, Copy)]
pub struct EntityKeyer {
    config: EntityKeyConfig,
    scale: f64,
}

impl EntityKeyer {
    /// Create a keyer for the given configuration.
    #[must_use]
    pub fn new(config: EntityKeyConfig) -> Self {
        let scale = 10_f64.powi(config.precision as i32);
        Self { config, scale }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &EntityKeyConfig {
        &self.config
    }

    /// Round a point to integer units of `10^-precision` degrees.
    ///
    /// Working in integers makes `-0.0` and `0.0` the same cell.
    #[must_use]
    pub fn normalize(&self, point: GeoPoint) -> (i64, i64) {
        ((point.longitude * self.scale).round() as i64, (point.latitude * self.scale).round() as i64)
    }

    /// Hash a normalized key into an entity id.
    ///
    /// The first eight bytes of the SHA-256 digest, read big-endian and
    /// shifted down one bit so every id fits a signed 64-bit column.
    #[must_use]
    pub fn hash_key(&self, key: (i64, i64)) -> EntityId {
        let mut hasher = Sha256::new();
        hasher.update(self.config.precision.to_be_bytes());
        hasher.update(key.0.to_be_bytes());
        hasher.update(key.1.to_be_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0_u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        EntityId::new(u64::from_be_bytes(prefix) >> 1)
    }

    /// Entity id of an event, or `None` if its anchor location is unknown.
    #[must_use]
    pub fn entity_of(&self, event: &TripEvent) -> Option<EntityId> {
        let point = match self.config.anchor {
            LocationAnchor::Pickup => event.pickup,
            LocationAnchor::Dropoff => event.dropoff,
        }?;
        Some(self.hash_key(self.normalize(point)))
    }
}

/// Histories keyed by entity, plus the events that could not be keyed.
#[derive(Debug, Clone, Default)]
pub struct HistoryBuild {
    /// One history per entity, ordered by entity id.
    pub histories: BTreeMap<EntityId, EntityHistory>,
    /// Events without a usable anchor location.
    pub rejected: RejectionLog,
}

impl HistoryBuild {
    /// Number of entities.
    #[must_use]
    pub fn n_entities(&self) -> usize {
        self.histories.len()
    }
}

/// Group events into per-entity histories.
///
/// The result depends only on the multiset of events, not on their order.
#[must_use]
pub fn build_histories(events: &[TripEvent], keyer: &EntityKeyer) -> HistoryBuild {
    let mut build = HistoryBuild::default();

    for event in events {
        match keyer.entity_of(event) {
            Some(entity) => {
                build
                    .histories
                    .entry(entity)
                    .or_insert_with(|| EntityHistory::new(entity))
                    .insert(event.id.clone());
            }
            None => build.rejected.push(Some(event.id.to_string()), RejectReason::MissingLocation),
        }
    }

    info!(
        events = events.len(),
        entities = build.n_entities(),
        unkeyed = build.rejected.count(),
        "built entity histories"
    );
    build
}
