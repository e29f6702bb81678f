#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/churnfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod source;
pub use source::{FrameSource, TRIP_COLUMNS, parse_timestamp, read_trip_csv, trips_from_frame};

mod frames;
pub use frames::{
    daily_to_frame, features_to_frame, histories_to_frame, labels_to_frame, rejections_to_frame,
    training_to_frame, trend_to_frame, write_csv,
};

mod error;
pub use error::UtilsError;
