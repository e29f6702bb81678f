//! CSV export of a whole pipeline run.

use std::path::{Path, PathBuf};

use churnfeat_pipeline::PipelineOutput;
use churnfeat_utils::{
    UtilsError, daily_to_frame, features_to_frame, histories_to_frame, labels_to_frame,
    rejections_to_frame, training_to_frame, trend_to_frame, write_csv,
};

/// Write every table of `output` into `dir` as `<table>.csv`.
///
/// The directory is created if needed. `trend.csv` is only written when the
/// run computed a trend.
///
/// # Errors
/// Returns an error if a frame cannot be built or a file cannot be written.
pub fn write_output(
    output: &PipelineOutput,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, UtilsError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let rejected = output
        .report
        .rejected
        .entries()
        .iter()
        .map(|entry| (entry.trip_id.as_deref(), entry.reason.to_string()));

    let mut tables = vec![
        ("histories", histories_to_frame(&output.histories)?),
        ("daily", daily_to_frame(&output.daily)?),
        ("features", features_to_frame(&output.features)?),
        ("labels", labels_to_frame(&output.labels)?),
        ("training", training_to_frame(&output.training)?),
        ("rejected", rejections_to_frame(rejected)?),
    ];
    if let Some(trend) = &output.trend {
        tables.push(("trend", trend_to_frame(trend)?));
    }

    let mut written = Vec::with_capacity(tables.len());
    for (name, mut df) in tables {
        let path = dir.join(format!("{name}.csv"));
        write_csv(&mut df, &path)?;
        written.push(path);
    }
    Ok(written)
}
