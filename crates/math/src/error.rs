//! Error types for window operations.

/// Errors that can occur during window operations.
#[derive(Debug, thiserror::Error)]
pub enum MathError {
    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Two rows share the same key.
    #[error("duplicate key {key} at index {index}")]
    DuplicateKey {
        /// Index of the second occurrence.
        index: usize,
        /// Repeated key.
        key: i64,
    },

    /// Keys are not in ascending order.
    #[error("keys out of order at index {index}: {key} follows {previous}")]
    UnsortedKeys {
        /// Index of the offending row.
        index: usize,
        /// Key of the previous row.
        previous: i64,
        /// Key of the offending row.
        key: i64,
    },

    /// A row window was requested over a series with gaps.
    #[error("row window over gapped series: key {key} at index {index} follows {previous}")]
    GappedSeries {
        /// Index of the first row after the gap.
        index: usize,
        /// Key before the gap.
        previous: i64,
        /// Key after the gap.
        key: i64,
    },

    /// Invalid window parameter.
    #[error("invalid window: {0}")]
    InvalidWindow(String),
}
