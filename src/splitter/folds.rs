//! Restartable fold iteration.
//!
//! A [`Splitter`] binds a strategy to a dataset. The fold plan is resolved
//! once in [`Splitter::new`]; after that the only mutable state is the cursor
//! driven by [`Splitter::next_fold`] and cleared by [`Splitter::reset`].
//! [`Splitter::iter`] and [`Splitter::fold_at`] never touch the cursor.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::data::{Data, Tournament};

use super::error::SplitResult;
use super::strategy::{FoldPlan, SplitStrategy};

/// One (fit, predict) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Fold number (0-indexed).
    pub index: usize,
    pub fit: Data,
    pub predict: Data,
}

impl Fold {
    pub fn into_pair(self) -> (Data, Data) {
        (self.fit, self.predict)
    }
}

/// Where a splitter's cursor stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitterState {
    /// Freshly built or reset; no fold consumed yet.
    Ready,
    /// Some, but not all, folds consumed.
    Iterating,
    /// Every fold consumed. A splitter with no folds starts here.
    Exhausted,
}

/// A strategy bound to a dataset.
pub struct Splitter {
    strategy: SplitStrategy,
    data: Data,
    base: Data,
    plans: Vec<FoldPlan>,
    cursor: usize,
}

impl Splitter {
    /// Bind `strategy` to `data`, validating its parameters up front.
    pub fn new(data: Data, strategy: SplitStrategy) -> SplitResult<Self> {
        strategy.validate()?;
        let base = strategy.base(&data);
        let plans = strategy.plan(&base)?;

        info!(
            "{} splitter over {} rows ({} eras): {} folds",
            strategy,
            base.len(),
            base.unique_eras().len(),
            plans.len()
        );
        if plans.is_empty() {
            warn!("{} yields no folds for this dataset", strategy);
        }

        let splitter = Self {
            strategy,
            data,
            base,
            plans,
            cursor: 0,
        };
        for index in splitter.folds_with_empty_side() {
            warn!(
                "{} fold {} has an empty fit or predict side",
                splitter.strategy, index
            );
        }
        Ok(splitter)
    }

    pub fn tournament(data: Data) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::Tournament)
    }

    pub fn flip(data: Data) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::Flip)
    }

    pub fn validation(data: Data) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::Validation)
    }

    pub fn cheat(data: Data) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::Cheat)
    }

    pub fn cv(data: Data, kfold: usize) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::cv(kfold))
    }

    pub fn loocv(data: Data) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::loocv())
    }

    pub fn ignore_era_cv(data: Data, kfold: usize, tournament: Tournament) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::ignore_era_cv(kfold, tournament))
    }

    pub fn fraction(data: Data, fit_fraction: f64) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::fraction(fit_fraction))
    }

    pub fn consecutive_cv(data: Data, kfold: usize) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::consecutive_cv(kfold))
    }

    pub fn roll(
        data: Data,
        fit_window: usize,
        predict_window: usize,
        step: usize,
    ) -> SplitResult<Self> {
        Self::new(data, SplitStrategy::roll(fit_window, predict_window, step))
    }

    pub fn strategy(&self) -> &SplitStrategy {
        &self.strategy
    }

    /// The dataset the splitter was built over.
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Number of folds in one full pass. Fixed at construction.
    pub fn fold_count(&self) -> usize {
        self.plans.len()
    }

    pub fn state(&self) -> SplitterState {
        if self.cursor >= self.plans.len() {
            SplitterState::Exhausted
        } else if self.cursor == 0 {
            SplitterState::Ready
        } else {
            SplitterState::Iterating
        }
    }

    /// Materialize fold `index` without moving the cursor.
    pub fn fold_at(&self, index: usize) -> Option<Fold> {
        let plan = self.plans.get(index)?;
        let fold = Fold {
            index,
            fit: plan.fit.apply(&self.base),
            predict: plan.predict.apply(&self.base),
        };
        debug!(
            "{} fold {}: fit {} rows, predict {} rows",
            self.strategy,
            index,
            fold.fit.len(),
            fold.predict.len()
        );
        Some(fold)
    }

    /// Indices of folds whose fit or predict side selects no rows.
    pub fn folds_with_empty_side(&self) -> Vec<usize> {
        self.plans
            .iter()
            .enumerate()
            .filter(|(_, plan)| {
                plan.fit.apply(&self.base).is_empty() || plan.predict.apply(&self.base).is_empty()
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Produce the fold under the cursor and advance it.
    pub fn next_fold(&mut self) -> Option<Fold> {
        let fold = self.fold_at(self.cursor)?;
        self.cursor += 1;
        Some(fold)
    }

    /// Rewind the cursor to the first fold.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// A fresh pass over every fold, independent of the cursor.
    pub fn iter(&self) -> Folds<'_> {
        Folds {
            splitter: self,
            next: 0,
        }
    }

    /// Materialize every fold in parallel.
    pub fn par_folds(&self) -> Vec<Fold> {
        (0..self.plans.len())
            .into_par_iter()
            .filter_map(|index| self.fold_at(index))
            .collect()
    }
}

impl Iterator for Splitter {
    type Item = Fold;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_fold()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.plans.len().saturating_sub(self.cursor);
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a Splitter {
    type Item = Fold;
    type IntoIter = Folds<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing pass over a splitter's folds.
pub struct Folds<'a> {
    splitter: &'a Splitter,
    next: usize,
}

impl Iterator for Folds<'_> {
    type Item = Fold;

    fn next(&mut self) -> Option<Self::Item> {
        let fold = self.splitter.fold_at(self.next)?;
        self.next += 1;
        Some(fold)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.splitter.fold_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Folds<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::tests::synthetic;
    use crate::data::{Era, Region, Row};
    use crate::splitter::SplitError;

    fn era_data(eras: u32, rows_per_era: usize) -> Data {
        let rows = (1..=eras)
            .flat_map(|era| {
                (0..rows_per_era).map(move |i| {
                    Row::new(
                        format!("e{}r{}", era, i),
                        Era::new(era),
                        Region::Train,
                        vec![i as f32],
                    )
                    .with_target(Tournament::Bernie, 0.5)
                })
            })
            .collect();
        Data::from_rows(rows).unwrap()
    }

    #[test]
    fn test_state_machine() {
        let mut splitter = Splitter::cv(era_data(3, 2), 3).unwrap();
        assert_eq!(splitter.state(), SplitterState::Ready);
        splitter.next_fold().unwrap();
        assert_eq!(splitter.state(), SplitterState::Iterating);
        splitter.next_fold().unwrap();
        splitter.next_fold().unwrap();
        assert_eq!(splitter.state(), SplitterState::Exhausted);
        assert!(splitter.next_fold().is_none());
        splitter.reset();
        assert_eq!(splitter.state(), SplitterState::Ready);
    }

    #[test]
    fn test_cv_three_eras_scenario() {
        let splitter = Splitter::cv(era_data(3, 2), 3).unwrap();
        let folds: Vec<Fold> = splitter.iter().collect();
        assert_eq!(folds.len(), 3);
        for (i, fold) in folds.iter().enumerate() {
            let held = Era::new(i as u32 + 1);
            assert_eq!(fold.predict.unique_eras(), vec![held]);
            let fit = fold.fit.unique_eras();
            assert_eq!(fit.len(), 2);
            assert!(!fit.contains(&held));
        }
    }

    #[test]
    fn test_roll_scenario() {
        let splitter = Splitter::roll(era_data(5, 2), 3, 1, 1).unwrap();
        assert_eq!(splitter.fold_count(), 2);
        let e = Era::new;
        let folds: Vec<Fold> = splitter.iter().collect();
        assert_eq!(folds[0].fit.unique_eras(), vec![e(1), e(2), e(3)]);
        assert_eq!(folds[0].predict.unique_eras(), vec![e(4)]);
        assert_eq!(folds[1].fit.unique_eras(), vec![e(2), e(3), e(4)]);
        assert_eq!(folds[1].predict.unique_eras(), vec![e(5)]);
    }

    #[test]
    fn test_roll_with_too_few_eras_has_no_folds() {
        let mut splitter = Splitter::roll(era_data(3, 1), 3, 1, 1).unwrap();
        assert_eq!(splitter.fold_count(), 0);
        assert_eq!(splitter.state(), SplitterState::Exhausted);
        assert!(splitter.next().is_none());
    }

    #[test]
    fn test_loocv_four_eras_scenario() {
        let data = era_data(4, 3);
        let counts = data.era_counts();
        let splitter = Splitter::loocv(data.clone()).unwrap();
        assert_eq!(splitter.fold_count(), 4);
        for fold in &splitter {
            let held = fold.predict.unique_eras();
            assert_eq!(held.len(), 1);
            assert!(!fold.fit.unique_eras().contains(&held[0]));
            assert_eq!(fold.predict.len(), counts[&held[0]]);
            assert_eq!(fold.fit.len() + fold.predict.len(), data.len());
        }
    }

    #[test]
    fn test_tournament_flip_validation() {
        let data = synthetic(4, 2);
        let tournament = Splitter::tournament(data.clone()).unwrap().iter().next().unwrap();
        assert_eq!(tournament.fit, data.train());
        assert_eq!(tournament.predict, data.tournament());

        let flip = Splitter::flip(data.clone()).unwrap().iter().next().unwrap();
        assert_eq!(flip.fit, tournament.predict);
        assert_eq!(flip.predict, tournament.fit);

        let validation = Splitter::validation(data.clone()).unwrap().iter().next().unwrap();
        assert_eq!(validation.fit, data.train());
        assert_eq!(validation.predict, data.region(Region::Validation));
    }

    #[test]
    fn test_cheat_fit_equals_predict() {
        let data = synthetic(2, 2);
        let splitter = Splitter::cheat(data.clone()).unwrap();
        assert_eq!(splitter.fold_count(), 1);
        let fold = splitter.fold_at(0).unwrap();
        assert_eq!(fold.fit, data);
        assert_eq!(fold.predict, data);
    }

    #[test]
    fn test_ignore_era_cv_splits_eras() {
        let splitter = Splitter::ignore_era_cv(era_data(2, 5), 3, Tournament::Bernie).unwrap();
        assert_eq!(splitter.fold_count(), 3);
        let sizes: Vec<usize> = splitter.iter().map(|f| f.predict.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        // The second block straddles the era boundary.
        let second = splitter.fold_at(1).unwrap();
        assert_eq!(second.predict.unique_eras().len(), 2);
        assert_eq!(second.fit.len(), 7);
    }

    #[test]
    fn test_ignore_era_cv_without_targets_fails() {
        let result = Splitter::ignore_era_cv(era_data(2, 5), 2, Tournament::Jordan);
        assert!(matches!(result, Err(SplitError::Config(_))));
    }

    #[test]
    fn test_fraction_splitter() {
        let splitter = Splitter::fraction(era_data(4, 2), 0.5).unwrap();
        let fold = splitter.fold_at(0).unwrap();
        assert_eq!(fold.fit.unique_eras(), vec![Era::new(1), Era::new(2)]);
        assert_eq!(fold.predict.unique_eras(), vec![Era::new(3), Era::new(4)]);
    }

    #[test]
    fn test_config_errors_are_eager() {
        let data = era_data(3, 1);
        assert!(matches!(Splitter::cv(data.clone(), 1), Err(SplitError::Config(_))));
        assert!(matches!(Splitter::cv(data.clone(), 4), Err(SplitError::Config(_))));
        assert!(matches!(Splitter::fraction(data.clone(), 1.0), Err(SplitError::Config(_))));
        assert!(matches!(Splitter::roll(data, 2, 0, 1), Err(SplitError::Config(_))));
    }

    #[test]
    fn test_iter_does_not_move_cursor() {
        let mut splitter = Splitter::consecutive_cv(era_data(6, 1), 3).unwrap();
        splitter.next_fold().unwrap();
        assert_eq!(splitter.iter().count(), 3);
        assert_eq!(splitter.iter().len(), 3);
        assert_eq!(splitter.next_fold().map(|f| f.index), Some(1));
    }

    #[test]
    fn test_par_folds_match_sequential() {
        let splitter = Splitter::cv(era_data(7, 3), 4).unwrap();
        let sequential: Vec<Fold> = splitter.iter().collect();
        assert_eq!(splitter.par_folds(), sequential);
    }

    #[test]
    fn test_fold_at_on_owned_splitter() {
        let mut splitter = Splitter::cv(era_data(3, 2), 3).unwrap();
        let second = splitter.fold_at(1).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.predict.unique_eras(), vec![Era::new(2)]);
        assert_eq!(splitter.state(), SplitterState::Ready);
        assert_eq!(splitter.next_fold().map(|f| f.index), Some(0));
        assert_eq!(splitter.fold_at(1), Some(second));
    }

    #[test]
    fn test_loocv_keeps_high_eras_apart_from_live() {
        let rows = [Era::new(998), Era::new(999), Era::new(1000), Era::LIVE]
            .iter()
            .flat_map(|&era| {
                (0..2).map(move |i| {
                    Row::new(format!("{}r{}", era, i), era, Region::Train, vec![i as f32])
                        .with_target(Tournament::Bernie, 0.5)
                })
            })
            .collect();
        let data = Data::from_rows(rows).unwrap();
        let eras = data.unique_eras();
        assert_eq!(eras.len(), 4);
        assert_eq!(eras.last(), Some(&Era::LIVE));

        let splitter = Splitter::loocv(data).unwrap();
        assert_eq!(splitter.fold_count(), 4);
        let predicted: Vec<Vec<Era>> = splitter.iter().map(|f| f.predict.unique_eras()).collect();
        assert_eq!(
            predicted,
            vec![
                vec![Era::new(998)],
                vec![Era::new(999)],
                vec![Era::new(1000)],
                vec![Era::LIVE]
            ]
        );
    }

    #[test]
    fn test_roll_with_overflowing_window_has_no_folds() {
        let splitter = Splitter::roll(era_data(5, 1), usize::MAX, 1, 1).unwrap();
        assert_eq!(splitter.fold_count(), 0);
        assert_eq!(splitter.state(), SplitterState::Exhausted);

        let splitter = Splitter::roll(era_data(5, 1), 1, usize::MAX, 1).unwrap();
        assert_eq!(splitter.fold_count(), 0);
    }

    #[test]
    fn test_folds_with_empty_side() {
        let splitter = Splitter::validation(era_data(3, 2)).unwrap();
        assert_eq!(splitter.fold_count(), 1);
        assert_eq!(splitter.folds_with_empty_side(), vec![0]);

        let splitter = Splitter::cv(era_data(3, 2), 3).unwrap();
        assert!(splitter.folds_with_empty_side().is_empty());
    }

    #[test]
    fn test_fold_out_of_range() {
        let splitter = Splitter::tournament(synthetic(2, 1)).unwrap();
        assert!(splitter.fold_at(1).is_none());
    }
}
