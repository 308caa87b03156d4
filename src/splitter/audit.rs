//! Partition checks and fold reports.
//!
//! Checks:
//! - No row is predicted twice within one pass
//! - Fit and predict share no row (except for the cheat strategy)
//! - Era-partitioning strategies keep fit and predict eras disjoint
//! - Fold count matches the plan computed at construction

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::Era;

use super::error::{SplitError, SplitResult};
use super::folds::{Fold, Splitter};
use super::strategy::SplitStrategy;

/// Shape of one fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSummary {
    pub index: usize,
    pub fit_rows: usize,
    pub predict_rows: usize,
    pub fit_eras: Vec<Era>,
    pub predict_eras: Vec<Era>,
}

impl FoldSummary {
    pub fn from_fold(fold: &Fold) -> Self {
        Self {
            index: fold.index,
            fit_rows: fold.fit.len(),
            predict_rows: fold.predict.len(),
            fit_eras: fold.fit.unique_eras(),
            predict_eras: fold.predict.unique_eras(),
        }
    }
}

/// Every fold of one full pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitReport {
    pub strategy: SplitStrategy,
    pub fold_count: usize,
    pub predict_rows: usize,
    pub folds: Vec<FoldSummary>,
}

impl Splitter {
    /// Summarize a full pass without checking it.
    pub fn report(&self) -> SplitReport {
        let folds: Vec<FoldSummary> = self.iter().map(|f| FoldSummary::from_fold(&f)).collect();
        SplitReport {
            strategy: self.strategy().clone(),
            fold_count: self.fold_count(),
            predict_rows: folds.iter().map(|f| f.predict_rows).sum(),
            folds,
        }
    }

    /// Run a full pass and verify the partition guarantees.
    pub fn audit(&self) -> SplitResult<SplitReport> {
        let strategy = self.strategy();
        let mut predicted: HashSet<u32> = HashSet::new();
        let mut folds = Vec::with_capacity(self.fold_count());

        for fold in self.iter() {
            // Ids are unique within a frame, so frame rows stand in for ids.
            for (&row, id) in fold.predict.frame_rows().iter().zip(fold.predict.ids()) {
                if !predicted.insert(row) {
                    return Err(SplitError::Invariant(format!(
                        "{}: id '{}' predicted more than once (fold {})",
                        strategy, id, fold.index
                    )));
                }
            }

            if !strategy.allows_self_overlap() {
                let fit_rows: HashSet<u32> = fold.fit.frame_rows().iter().copied().collect();
                if let Some(shared) = fold.predict.frame_rows().iter().find(|r| fit_rows.contains(*r))
                {
                    return Err(SplitError::Invariant(format!(
                        "{}: fold {} fits and predicts frame row {}",
                        strategy, fold.index, shared
                    )));
                }
            }

            let summary = FoldSummary::from_fold(&fold);
            if strategy.partitions_eras() {
                let fit_eras: HashSet<Era> = summary.fit_eras.iter().copied().collect();
                let union: HashSet<Era> = fit_eras
                    .iter()
                    .copied()
                    .chain(summary.predict_eras.iter().copied())
                    .collect();
                if fit_eras.len() + summary.predict_eras.len() != union.len() {
                    return Err(SplitError::Invariant(format!(
                        "{}: fold {} shares eras between fit and predict",
                        strategy, fold.index
                    )));
                }
            }
            folds.push(summary);
        }

        if folds.len() != self.fold_count() {
            return Err(SplitError::Invariant(format!(
                "{}: produced {} folds, expected {}",
                strategy,
                folds.len(),
                self.fold_count()
            )));
        }

        info!("{} passed audit with {} folds", strategy, folds.len());
        Ok(SplitReport {
            strategy: strategy.clone(),
            fold_count: folds.len(),
            predict_rows: predicted.len(),
            folds,
        })
    }
}
