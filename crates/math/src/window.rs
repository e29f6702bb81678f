//! Trailing window means.

use crate::{MathError, check_strictly_increasing, first_gap};

/// Shape of a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Rows whose key lies in `[k - width, k]`.
    ///
    /// With `zero_fill`, keys inside the span that have no row count as zero
    /// and the mean is taken over `width + 1` slots; otherwise only present
    /// rows are averaged.
    Span {
        /// Span width in key units.
        width: i64,
        /// Treat missing keys as zero-valued rows.
        zero_fill: bool,
    },
    /// The current row and up to `preceding` rows before it.
    ///
    /// Only meaningful on dense series.
    Rows {
        /// Number of preceding rows.
        preceding: usize,
    },
}

/// Mean of one trailing window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPoint {
    /// Window mean.
    pub mean: f64,
    /// Rows that fell inside the window.
    pub observations: usize,
}

/// Trailing mean over an ordered series.
#[derive(Debug, Clone)]
pub struct TrailingMean {
    /// Window shape.
    pub window: Window,
}

impl TrailingMean {
    /// Create a new trailing mean.
    ///
    /// # Errors
    /// Returns `MathError::InvalidWindow` for a negative span width.
    pub fn new(window: Window) -> Result<Self, MathError> {
        if let Window::Span { width, .. } = window
            && width < 0
        {
            return Err(MathError::InvalidWindow(format!("negative span width {width}")));
        }
        Ok(Self { window })
    }

    /// Evaluate the window at every row of the series.
    ///
    /// `keys` must be strictly increasing. The point at row `i` only reads
    /// rows `..=i`, so later rows never influence earlier points.
    ///
    /// # Errors
    /// Returns `MathError::DimensionMismatch` when the slices differ in length,
    /// a key ordering error from [`check_strictly_increasing`], or
    /// `MathError::GappedSeries` for a row window over a gapped series.
    pub fn apply(&self, keys: &[i64], values: &[f64]) -> Result<Vec<WindowPoint>, MathError> {
        if keys.len() != values.len() {
            return Err(MathError::DimensionMismatch { expected: keys.len(), actual: values.len() });
        }
        check_strictly_increasing(keys)?;

        match self.window {
            Window::Span { width, zero_fill } => Ok(span_means(keys, values, width, zero_fill)),
            Window::Rows { preceding } => {
                if let Some(index) = first_gap(keys) {
                    return Err(MathError::GappedSeries {
                        index,
                        previous: keys[index - 1],
                        key: keys[index],
                    });
                }
                Ok(row_means(values, preceding))
            }
        }
    }
}

fn span_means(keys: &[i64], values: &[f64], width: i64, zero_fill: bool) -> Vec<WindowPoint> {
    let mut start = 0;
    keys.iter()
        .enumerate()
        .map(|(i, &key)| {
            let lower = key.saturating_sub(width);
            while keys[start] < lower {
                start += 1;
            }
            let observations = i + 1 - start;
            let sum: f64 = values[start..=i].iter().sum();
            let slots = if zero_fill { width as f64 + 1.0 } else { observations as f64 };
            WindowPoint { mean: sum / slots, observations }
        })
        .collect()
}

fn row_means(values: &[f64], preceding: usize) -> Vec<WindowPoint> {
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(preceding);
            let observations = i + 1 - start;
            let sum: f64 = values[start..=i].iter().sum();
            WindowPoint { mean: sum / observations as f64, observations }
        })
        .collect()
}

/// Rolling mean over a fixed number of rows.
///
/// The value at row `i` averages rows `i + 1 - window ..= i`; it is `None`
/// until at least `min_periods` rows are available. With
/// `min_periods == window` the leading `window - 1` rows are `None`.
///
/// # Errors
/// Returns `MathError::InvalidWindow` if `window` is zero or `min_periods`
/// exceeds `window`.
pub fn rolling_mean(
    values: &[f64],
    window: usize,
    min_periods: usize,
) -> Result<Vec<Option<f64>>, MathError> {
    if window == 0 {
        return Err(MathError::InvalidWindow("row window must be at least 1".to_string()));
    }
    if min_periods > window {
        return Err(MathError::InvalidWindow(format!(
            "min_periods {min_periods} exceeds window {window}"
        )));
    }

    Ok(row_means(values, window - 1)
        .into_iter()
        .map(|p| (p.observations >= min_periods.max(1)).then_some(p.mean))
        .collect())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;

    fn span(width: i64) -> TrailingMean {
        TrailingMean::new(Window::Span { width, zero_fill: false }).unwrap()
    }

    #[test]
    fn span_skips_gap_days() {
        // day3 missing: the day4 window [2, 4] holds day2 and day4 only
        let points = span(2).apply(&[1, 2, 4], &[10.0, 20.0, 30.0]).unwrap();

        assert_eq!(points.len(), 3);
        assert_relative_eq!(points[0].mean, 10.0);
        assert_relative_eq!(points[1].mean, 15.0);
        assert_relative_eq!(points[2].mean, 25.0);
        assert_eq!(points[2].observations, 2);
    }

    #[test]
    fn span_zero_fill_divides_by_full_width() {
        let window = Window::Span { width: 2, zero_fill: true };
        let points = TrailingMean::new(window).unwrap().apply(&[1, 2, 4], &[10.0, 20.0, 30.0]);
        let points = points.unwrap();

        assert_relative_eq!(points[0].mean, 10.0 / 3.0);
        assert_relative_eq!(points[2].mean, 50.0 / 3.0);
        assert_eq!(points[2].observations, 2);
    }

    #[test]
    fn span_width_zero_is_identity() {
        let values = [3.0, 7.5, 1.25];
        let points = span(0).apply(&[10, 11, 20], &values).unwrap();
        let means: Vec<f64> = points.iter().map(|p| p.mean).collect();
        assert_eq!(means, values);
    }

    #[test]
    fn span_ignores_future_rows() {
        let keys = [1, 2, 3, 6];
        let base = span(2).apply(&keys, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let changed = span(2).apply(&keys, &[1.0, 2.0, 3.0, 400.0]).unwrap();
        assert_eq!(base[..3], changed[..3]);
    }

    #[test]
    fn rows_window_on_dense_series() {
        let mean = TrailingMean::new(Window::Rows { preceding: 2 }).unwrap();
        let points = mean.apply(&[1, 2, 3, 4], &[2.0, 4.0, 6.0, 8.0]).unwrap();

        assert_relative_eq!(points[0].mean, 2.0);
        assert_relative_eq!(points[1].mean, 3.0);
        assert_relative_eq!(points[2].mean, 4.0);
        assert_relative_eq!(points[3].mean, 6.0);
        assert_eq!(points[3].observations, 3);
    }

    #[test]
    fn rows_window_rejects_gaps() {
        let mean = TrailingMean::new(Window::Rows { preceding: 6 }).unwrap();
        let err = mean.apply(&[1, 2, 5], &[1.0, 1.0, 1.0]).unwrap_err();
        assert!(matches!(err, MathError::GappedSeries { index: 2, previous: 2, key: 5 }));
    }

    #[test]
    fn apply_rejects_duplicates_and_mismatch() {
        let err = span(1).apply(&[1, 1], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, MathError::DuplicateKey { .. }));

        let err = span(1).apply(&[1, 2], &[1.0]).unwrap_err();
        assert!(matches!(err, MathError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn negative_width_rejected() {
        assert!(TrailingMean::new(Window::Span { width: -1, zero_fill: false }).is_err());
    }

    #[rstest]
    #[case(1, 1)]
    #[case(3, 3)]
    #[case(7, 7)]
    #[case(7, 1)]
    fn rolling_mean_min_periods(#[case] window: usize, #[case] min_periods: usize) {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let out = rolling_mean(&values, window, min_periods).unwrap();

        assert_eq!(out.len(), values.len());
        let leading_none = out.iter().take_while(|v| v.is_none()).count();
        assert_eq!(leading_none, min_periods - 1);
        // last window covers 10 - window + 1 ..= 10
        let expected = (10 - window + 1..=10).map(|v| v as f64).sum::<f64>() / window as f64;
        assert_relative_eq!(out[9].unwrap(), expected);
    }

    #[test]
    fn rolling_mean_invalid_parameters() {
        assert!(rolling_mean(&[1.0], 0, 0).is_err());
        assert!(rolling_mean(&[1.0], 3, 4).is_err());
    }
}
