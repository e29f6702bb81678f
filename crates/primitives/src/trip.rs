//! Trip record and event type definitions.

use serde::{Deserialize, Serialize};

use crate::{EventId, Timestamp};

/// A longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl GeoPoint {
    /// Create a new point.
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Build a point only when both coordinates are present and finite.
    #[must_use]
    pub fn from_parts(longitude: Option<f64>, latitude: Option<f64>) -> Option<Self> {
        match (longitude, latitude) {
            (Some(lon), Some(lat)) => Some(Self::new(lon, lat)).filter(|p| p.is_finite()),
            _ => None,
        }
    }

    /// Whether both coordinates are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

/// A raw row as scanned from the trip table, before validation.
///
/// Every column is optional: the source may hand back nulls or values that
/// failed to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    /// Trip identifier.
    pub trip_id: Option<String>,
    /// Pickup instant.
    pub pickup_at: Option<Timestamp>,
    /// Pickup location.
    pub pickup: Option<GeoPoint>,
    /// Dropoff location.
    pub dropoff: Option<GeoPoint>,
    /// Total amount charged for the trip.
    pub amount: Option<f64>,
}

impl TripRecord {
    /// Validate the record into an event.
    ///
    /// Locations stay optional here; whether a missing location is fatal for
    /// the record depends on which one the entity key is derived from.
    ///
    /// # Errors
    /// Returns the name of the first required field that is missing or
    /// not a finite number.
    pub fn validate(self) -> Result<TripEvent, &'static str> {
        let id = match self.trip_id {
            Some(id) if !id.trim().is_empty() => EventId::new(id.trim()),
            _ => return Err("trip_id"),
        };
        let pickup_at = self.pickup_at.ok_or("pickup_datetime")?;
        let amount = self.amount.filter(|a| a.is_finite()).ok_or("total_amount")?;

        Ok(TripEvent {
            id,
            pickup_at,
            pickup: self.pickup.filter(GeoPoint::is_finite),
            dropoff: self.dropoff.filter(GeoPoint::is_finite),
            amount,
        })
    }
}

/// A validated, immutable trip event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripEvent {
    /// Unique identifier.
    pub id: EventId,
    /// Pickup instant.
    pub pickup_at: Timestamp,
    /// Pickup location, if known.
    pub pickup: Option<GeoPoint>,
    /// Dropoff location, if known.
    pub dropoff: Option<GeoPoint>,
    /// Total amount charged.
    pub amount: f64,
}

impl TripEvent {
    /// Create a new event.
    #[must_use]
    pub const fn new(
        id: EventId,
        pickup_at: Timestamp,
        pickup: Option<GeoPoint>,
        dropoff: Option<GeoPoint>,
        amount: f64,
    ) -> Self {
        Self { id, pickup_at, pickup, dropoff, amount }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn complete_record() -> TripRecord {
        TripRecord {
            trip_id: Some("1201746101".to_string()),
            pickup_at: Utc.with_ymd_and_hms(2015, 7, 1, 0, 4, 12).single(),
            pickup: Some(GeoPoint::new(-73.98, 40.75)),
            dropoff: Some(GeoPoint::new(-73.95, 40.78)),
            amount: Some(12.3),
        }
    }

    #[test]
    fn validate_complete_record() {
        let event = complete_record().validate().unwrap();
        assert_eq!(event.id.as_str(), "1201746101");
        assert_eq!(event.amount, 12.3);
        assert!(event.pickup.is_some());
    }

    #[test]
    fn validate_reports_missing_field() {
        let mut record = complete_record();
        record.trip_id = Some("   ".to_string());
        assert_eq!(record.validate(), Err("trip_id"));

        let mut record = complete_record();
        record.pickup_at = None;
        assert_eq!(record.validate(), Err("pickup_datetime"));

        let mut record = complete_record();
        record.amount = Some(f64::NAN);
        assert_eq!(record.validate(), Err("total_amount"));
    }

    #[test]
    fn non_finite_location_is_dropped() {
        let mut record = complete_record();
        record.dropoff = Some(GeoPoint::new(f64::INFINITY, 40.0));
        let event = record.validate().unwrap();
        assert!(event.dropoff.is_none());
        assert!(event.pickup.is_some());
    }

    #[test]
    fn geo_point_from_parts() {
        assert!(GeoPoint::from_parts(Some(-73.9), Some(40.7)).is_some());
        assert!(GeoPoint::from_parts(None, Some(40.7)).is_none());
        assert!(GeoPoint::from_parts(Some(f64::NAN), Some(40.7)).is_none());
    }
}
