#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/churnfeat/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod error;
pub use error::{PipelineError, Result};

mod config;
pub use config::{
    DayConvention, DuplicatePolicy, EntityKeyConfig, GapPolicy, JoinConfig, LabelConfig,
    LabelPolicy, LocationAnchor, MAX_KEY_PRECISION, PipelineConfig, PredictionSchedule,
    TargetSpec, TrendConfig, WindowConfig, WindowSpec,
};

mod ingest;
pub use ingest::{Ingested, RejectReason, RejectedRecord, RejectionLog, ingest};

mod history;
pub use history::{EntityKeyer, HistoryBuild, build_histories};

mod rollup;
pub use rollup::{DailyRollup, EventIndex};

mod window;
pub use window::TrailingWindowAggregator;

mod labels;
pub use labels::{
    ActivityIndex, ConstantTarget, DenseGrid, DenseLabelPairs, FnTarget, InactivityChurn,
    LabelGenerator,
};

mod asof;
pub use asof::{AsOfJoiner, JoinReport, PreparedFeatures};

mod trend;
pub use trend::{daily_trip_counts, trip_trend};

mod pipeline;
pub use pipeline::{FeaturePipeline, PipelineOutput, RunReport};

/// Re-export commonly used types.
pub mod prelude {
    pub use churnfeat_traits::{TargetFn, TripSource};

    pub use super::{FeaturePipeline, PipelineConfig, PipelineError, PipelineOutput};
}
