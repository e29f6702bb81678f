#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/churnfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod series;
pub use series::{check_strictly_increasing, first_gap};

mod window;
pub use window::{TrailingMean, Window, WindowPoint, rolling_mean};

mod error;
pub use error::MathError;
