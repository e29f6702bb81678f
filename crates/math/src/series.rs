//! Ordered series validation.

use crate::MathError;

/// Check that keys are strictly increasing.
///
/// # Errors
/// Returns `MathError::DuplicateKey` for the first repeated key and
/// `MathError::UnsortedKeys` for the first descending step.
pub fn check_strictly_increasing(keys: &[i64]) -> Result<(), MathError> {
    for (index, pair) in keys.windows(2).enumerate() {
        let (previous, key) = (pair[0], pair[1]);
        if key == previous {
            return Err(MathError::DuplicateKey { index: index + 1, key });
        }
        if key < previous {
            return Err(MathError::UnsortedKeys { index: index + 1, previous, key });
        }
    }
    Ok(())
}

/// Index of the first row that does not directly follow its predecessor.
///
/// A series is dense when every key is exactly one greater than the previous
/// key. Returns `None` for dense series (including empty and single-row ones).
#[must_use]
pub fn first_gap(keys: &[i64]) -> Option<usize> {
    keys.windows(2).position(|pair| pair[1] != pair[0] + 1).map(|i| i + 1)
}
