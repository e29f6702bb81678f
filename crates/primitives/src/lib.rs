#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/churnfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod ids;
pub use ids::{EntityId, EventId};

mod history;
pub use history::EntityHistory;

mod trip;
pub use trip::{GeoPoint, TripEvent, TripRecord};

mod daily;
pub use daily::{DailyAggregate, DailyTripCount, WindowedFeature};

mod label;
pub use label::{AsOfValue, FeatureTargetRow, Label};

/// Re-export common date type.
pub type Date = chrono::NaiveDate;

/// Re-export the instant type used for event timestamps.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
