//! Label generation.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::FusedIterator;
use std::sync::Arc;

use churnfeat_primitives::{Date, EntityId, Label};
use churnfeat_traits::{LabelWindow, TargetFn};

use crate::LabelPolicy;

/// Days with activity, per entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityIndex {
    days: BTreeMap<EntityId, BTreeSet<Date>>,
}

impl ActivityIndex {
    /// Create an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self { days: BTreeMap::new() }
    }

    /// Record the active days of an entity.
    pub fn insert(&mut self, entity: EntityId, days: BTreeSet<Date>) {
        self.days.entry(entity).or_default().extend(days);
    }

    /// Entities, ascending.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.days.keys().copied()
    }

    /// Active days of one entity.
    #[must_use]
    pub fn days_of(&self, entity: EntityId) -> Option<&BTreeSet<Date>> {
        self.days.get(&entity)
    }

    /// Every day on which at least one entity was active, ascending.
    #[must_use]
    pub fn all_days(&self) -> Vec<Date> {
        let days: BTreeSet<Date> = self.days.values().flatten().copied().collect();
        days.into_iter().collect()
    }

    /// Whether `entity` was active on any day inside `window`.
    #[must_use]
    pub fn active_within(&self, entity: EntityId, window: &LabelWindow) -> bool {
        let Some(days) = self.days.get(&entity) else {
            return false;
        };
        let end = window.end();
        match window.prediction_date.succ_opt() {
            Some(start) if start <= end => days.range(start..=end).next().is_some(),
            _ => false,
        }
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// The same target for every label.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstantTarget {
    /// Target value.
    pub value: f64,
}

impl ConstantTarget {
    /// Create a constant target.
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self { value }
    }
}

impl TargetFn for ConstantTarget {
    fn target(&self, _entity: EntityId, _window: &LabelWindow) -> f64 {
        self.value
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// Churned (1.0) when the entity has no activity in the outcome window.
#[derive(Debug, Clone)]
pub struct InactivityChurn {
    activity: Arc<ActivityIndex>,
}

impl InactivityChurn {
    /// Create the target over an activity index.
    #[must_use]
    pub const fn new(activity: Arc<ActivityIndex>) -> Self {
        Self { activity }
    }
}

impl TargetFn for InactivityChurn {
    fn target(&self, entity: EntityId, window: &LabelWindow) -> f64 {
        if self.activity.active_within(entity, window) { 0.0 } else { 1.0 }
    }

    fn name(&self) -> &str {
        "inactivity"
    }
}

/// Adapts a closure into a [`TargetFn`].
pub struct FnTarget<F> {
    name: String,
    f: F,
}

impl<F> FnTarget<F>
where
    F: Fn(EntityId, &LabelWindow) -> f64 + Send + Sync,
{
    /// Wrap a closure under the given name.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> std::fmt::Debug for FnTarget<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTarget").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> TargetFn for FnTarget<F>
where
    F: Fn(EntityId, &LabelWindow) -> f64 + Send + Sync,
{
    fn target(&self, entity: EntityId, window: &LabelWindow) -> f64 {
        (self.f)(entity, window)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Entities crossed with candidate dates.
///
/// Only the two axes are stored; pairs are produced on demand by
/// [`DenseGrid::pairs`], which can be called any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DenseGrid {
    entities: Vec<EntityId>,
    dates: Vec<Date>,
}

impl DenseGrid {
    /// Build a grid; both axes are sorted and deduplicated.
    pub fn new(
        entities: impl IntoIterator<Item = EntityId>,
        dates: impl IntoIterator<Item = Date>,
    ) -> Self {
        let entities: BTreeSet<EntityId> = entities.into_iter().collect();
        let dates: BTreeSet<Date> = dates.into_iter().collect();
        Self { entities: entities.into_iter().collect(), dates: dates.into_iter().collect() }
    }

    /// Number of pairs.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.entities.len() * self.dates.len()
    }

    /// Check if empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Candidate dates, ascending.
    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Iterate pairs entity-major: every date of the first entity, then the next.
    #[must_use]
    pub fn pairs(&self) -> DenseLabelPairs<'_> {
        DenseLabelPairs { grid: self, front: 0, back: self.len() }
    }
}

/// Iterator over the pairs of a [`DenseGrid`].
#[derive(Debug, Clone)]
pub struct DenseLabelPairs<'a> {
    grid: &'a DenseGrid,
    front: usize,
    back: usize,
}

impl DenseLabelPairs<'_> {
    fn pair_at(&self, i: usize) -> (EntityId, Date) {
        let n_dates = self.grid.dates.len();
        (self.grid.entities[i / n_dates], self.grid.dates[i % n_dates])
    }
}

impl Iterator for DenseLabelPairs<'_> {
    type Item = (EntityId, Date);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let pair = self.pair_at(self.front);
        self.front += 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.back - self.front;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for DenseLabelPairs<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.pair_at(self.back))
    }
}

impl ExactSizeIterator for DenseLabelPairs<'_> {}

impl FusedIterator for DenseLabelPairs<'_> {}

/// Produces labels under a policy and a target function.
#[derive(Clone, Copy)]
pub struct LabelGenerator<'t> {
    policy: LabelPolicy,
    horizon_days: u32,
    target: &'t dyn TargetFn,
}

impl std::fmt::Debug for LabelGenerator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelGenerator")
            .field("policy", &self.policy)
            .field("horizon_days", &self.horizon_days)
            .field("target", &self.target.name())
            .finish()
    }
}

impl<'t> LabelGenerator<'t> {
    /// Create a generator.
    #[must_use]
    pub const fn new(policy: LabelPolicy, horizon_days: u32, target: &'t dyn TargetFn) -> Self {
        Self { policy, horizon_days, target }
    }

    /// Get the policy.
    #[must_use]
    pub const fn policy(&self) -> LabelPolicy {
        self.policy
    }

    fn label(&self, entity: EntityId, date: Date) -> Label {
        let window = LabelWindow::new(date, self.horizon_days);
        Label::new(entity, date, self.target.target(entity, &window))
    }

    /// Labels for every entity in the activity index, ordered by
    /// (entity, prediction date).
    ///
    /// Dense: one per (entity, candidate date) pair of the [`DenseGrid`].
    /// Sparse: one per candidate date on which the entity was active.
    #[must_use]
    pub fn generate(&self, activity: &ActivityIndex, candidates: &[Date]) -> Vec<Label> {
        match self.policy {
            LabelPolicy::Dense => {
                let grid = DenseGrid::new(activity.entities(), candidates.iter().copied());
                grid.pairs().map(|(entity, date)| self.label(entity, date)).collect()
            }
            LabelPolicy::Sparse => {
                let candidates: BTreeSet<Date> = candidates.iter().copied().collect();
                let mut labels = Vec::new();
                for entity in activity.entities() {
                    let Some(days) = activity.days_of(entity) else { continue };
                    labels.extend(
                        days.intersection(&candidates).map(|date| self.label(entity, *date)),
                    );
                }
                labels
            }
        }
    }
}
