//! Labelling function trait definitions.

use churnfeat_primitives::{Date, EntityId};

/// The span of time a label's outcome is judged over.
///
/// The outcome window is `(prediction_date, prediction_date + horizon_days]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelWindow {
    /// Point in time the prediction is made at.
    pub prediction_date: Date,
    /// Length of the outcome window in days.
    pub horizon_days: u32,
}

impl LabelWindow {
    /// Create a new label window.
    #[must_use]
    pub const fn new(prediction_date: Date, horizon_days: u32) -> Self {
        Self { prediction_date, horizon_days }
    }

    /// Last day of the outcome window (inclusive).
    #[must_use]
    pub fn end(&self) -> Date {
        self.prediction_date
            .checked_add_days(chrono::Days::new(u64::from(self.horizon_days)))
            .unwrap_or(Date::MAX)
    }

    /// Whether `day` falls inside the outcome window.
    #[must_use]
    pub fn contains(&self, day: Date) -> bool {
        day > self.prediction_date && day <= self.end()
    }
}

/// Maps an entity and a label window to a target outcome.
pub trait TargetFn: Send + Sync {
    /// Compute the target for `entity` over `window`.
    fn target(&self, entity: EntityId, window: &LabelWindow) -> f64;

    /// Returns the name of this labelling function.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds() {
        let day = Date::from_ymd_opt(2015, 7, 10).unwrap();
        let window = LabelWindow::new(day, 7);

        assert_eq!(window.end(), Date::from_ymd_opt(2015, 7, 17).unwrap());
        assert!(!window.contains(day));
        assert!(window.contains(Date::from_ymd_opt(2015, 7, 11).unwrap()));
        assert!(window.contains(Date::from_ymd_opt(2015, 7, 17).unwrap()));
        assert!(!window.contains(Date::from_ymd_opt(2015, 7, 18).unwrap()));
    }

    #[test]
    fn zero_horizon_is_empty() {
        let day = Date::from_ymd_opt(2015, 7, 10).unwrap();
        let window = LabelWindow::new(day, 0);
        assert!(!window.contains(day));
        assert!(!window.contains(day.succ_opt().unwrap()));
    }
}
