//! # churnfeat
//!
//! Point-in-time churn features from trip event logs.
//!
//! This crate provides a unified interface to the churnfeat crates.
//! Individual components can be enabled via feature flags.
//!
//! ## Features
//!
//! - `full` (default): Enables all components
//! - `primitives`: Core type definitions
//! - `traits`: Trip source and labelling function traits
//! - `math`: Trailing window kernels
//! - `pipeline`: Histories, rollups, windows, labels and as-of joins
//! - `utils`: Polars adapters and CSV export
//!
//! With both `pipeline` and `utils` enabled, [`write_output`] writes a whole
//! run as CSV tables.
//! - `cli`: The `build_features` binary and logging setup
//!
//! ## Example
//!
//! ```rust,ignore
//! use churnfeat::pipeline::{FeaturePipeline, PipelineConfig};
//! use churnfeat::utils::FrameSource;
//! use churnfeat::write_output;
//!
//! let source = FrameSource::from_csv("nyc_taxi_data.csv")?;
//! let output = FeaturePipeline::new(PipelineConfig::default())?.run(&source)?;
//! write_output(&output, "features/")?;
//! ```

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/churnfeat/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[cfg(feature = "primitives")]
#[doc(inline)]
pub use churnfeat_primitives as primitives;
#[cfg(feature = "traits")]
#[doc(inline)]
pub use churnfeat_traits as traits;
#[cfg(feature = "math")]
#[doc(inline)]
pub use churnfeat_math as math;
#[cfg(feature = "pipeline")]
#[doc(inline)]
pub use churnfeat_pipeline as pipeline;
#[cfg(feature = "utils")]
#[doc(inline)]
pub use churnfeat_utils as utils;

#[cfg(all(feature = "pipeline", feature = "utils"))]
mod export;
#[cfg(all(feature = "pipeline", feature = "utils"))]
pub use export::write_output;

#[cfg(feature = "cli")]
pub mod observability;

// used by the `build_features` binary only
#[cfg(feature = "cli")]
use {clap as _, serde_json as _};
