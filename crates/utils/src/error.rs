//! Error types for table adapters.

use churnfeat_traits::SourceError;

/// Errors that can occur while converting or writing tables.
#[derive(Debug, thiserror::Error)]
pub enum UtilsError {
    /// Polars error.
    #[error("polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Missing column.
    #[error("missing column: {0}")]
    MissingColumn(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl UtilsError {
    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<UtilsError> for SourceError {
    fn from(err: UtilsError) -> Self {
        match err {
            UtilsError::Polars(e) => Self::Polars(e),
            UtilsError::MissingColumn(name) => Self::MissingColumn(name),
            UtilsError::Io(e) => Self::Io(e),
        }
    }
}
