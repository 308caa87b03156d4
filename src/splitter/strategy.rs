//! Partition strategies.
//!
//! A [`SplitStrategy`] holds only configuration. Turning it into folds is a
//! two step affair: [`SplitStrategy::validate`] rejects bad parameters, then
//! [`SplitStrategy::plan`] resolves the configuration against a dataset into
//! one [`FoldPlan`] per fold. Plans are computed once, when a splitter is
//! built, so every pass over the folds sees the same partition.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{Data, Era, Region, Tournament};

use super::error::{SplitError, SplitResult};
use super::groups::{
    block_bounds, consecutive_blocks, fraction_split_point, roll_windows, round_robin,
};

pub const DEFAULT_KFOLD: usize = 5;
pub const DEFAULT_FIT_FRACTION: f64 = 0.5;
pub const DEFAULT_FIT_WINDOW: usize = 15;
pub const DEFAULT_PREDICT_WINDOW: usize = 10;
pub const DEFAULT_STEP: usize = 15;

fn default_kfold() -> usize {
    DEFAULT_KFOLD
}

fn default_train_only() -> bool {
    true
}

fn default_tournament() -> Tournament {
    Tournament::Bernie
}

/// How a dataset is cut into (fit, predict) pairs.
///
/// Strategies with a `train_only` flag partition the train region when it is
/// set and the whole dataset otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Fit on train, predict the tournament data.
    Tournament,

    /// Fit on the tournament data, predict train. Sanity check only.
    Flip,

    /// Fit on train, predict validation.
    Validation,

    /// Fit and predict the full dataset. Leaks by construction; only useful
    /// as an upper bound when checking a scoring pipeline.
    Cheat,

    /// K-fold over eras, era `i` held out in fold `i % kfold`.
    Cv {
        #[serde(default = "default_kfold")]
        kfold: usize,
        #[serde(default = "default_train_only")]
        train_only: bool,
    },

    /// Leave one era out.
    Loocv {
        #[serde(default = "default_train_only")]
        train_only: bool,
    },

    /// K-fold over the rows of one tournament, ignoring eras.
    IgnoreEraCv {
        #[serde(default = "default_kfold")]
        kfold: usize,
        #[serde(default = "default_tournament")]
        tournament: Tournament,
        #[serde(default = "default_train_only")]
        train_only: bool,
    },

    /// Fit on the first share of eras, predict the rest.
    Fraction {
        fit_fraction: f64,
        #[serde(default = "default_train_only")]
        train_only: bool,
    },

    /// K-fold over contiguous blocks of eras.
    ConsecutiveCv {
        #[serde(default = "default_kfold")]
        kfold: usize,
        #[serde(default = "default_train_only")]
        train_only: bool,
    },

    /// Adjacent fit/predict era windows sliding forward by `step` eras.
    Roll {
        fit_window: usize,
        predict_window: usize,
        step: usize,
        #[serde(default = "default_train_only")]
        train_only: bool,
    },
}

impl SplitStrategy {
    pub fn cv(kfold: usize) -> Self {
        Self::Cv {
            kfold,
            train_only: true,
        }
    }

    pub fn loocv() -> Self {
        Self::Loocv { train_only: true }
    }

    pub fn ignore_era_cv(kfold: usize, tournament: Tournament) -> Self {
        Self::IgnoreEraCv {
            kfold,
            tournament,
            train_only: true,
        }
    }

    pub fn fraction(fit_fraction: f64) -> Self {
        Self::Fraction {
            fit_fraction,
            train_only: true,
        }
    }

    pub fn consecutive_cv(kfold: usize) -> Self {
        Self::ConsecutiveCv {
            kfold,
            train_only: true,
        }
    }

    pub fn roll(fit_window: usize, predict_window: usize, step: usize) -> Self {
        Self::Roll {
            fit_window,
            predict_window,
            step,
            train_only: true,
        }
    }

    /// Every strategy with its default parameters.
    pub fn catalog() -> Vec<SplitStrategy> {
        vec![
            Self::Tournament,
            Self::Flip,
            Self::Validation,
            Self::Cheat,
            Self::cv(DEFAULT_KFOLD),
            Self::loocv(),
            Self::ignore_era_cv(DEFAULT_KFOLD, default_tournament()),
            Self::fraction(DEFAULT_FIT_FRACTION),
            Self::consecutive_cv(DEFAULT_KFOLD),
            Self::roll(DEFAULT_FIT_WINDOW, DEFAULT_PREDICT_WINDOW, DEFAULT_STEP),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tournament => "tournament",
            Self::Flip => "flip",
            Self::Validation => "validation",
            Self::Cheat => "cheat",
            Self::Cv { .. } => "cv",
            Self::Loocv { .. } => "loocv",
            Self::IgnoreEraCv { .. } => "ignore_era_cv",
            Self::Fraction { .. } => "fraction",
            Self::ConsecutiveCv { .. } => "consecutive_cv",
            Self::Roll { .. } => "roll",
        }
    }

    /// Whether folds are cut along era boundaries of a single era sequence,
    /// so fit and predict never share an era.
    pub fn partitions_eras(&self) -> bool {
        matches!(
            self,
            Self::Cv { .. }
                | Self::Loocv { .. }
                | Self::Fraction { .. }
                | Self::ConsecutiveCv { .. }
                | Self::Roll { .. }
        )
    }

    /// Whether fit and predict are allowed to share rows.
    pub fn allows_self_overlap(&self) -> bool {
        matches!(self, Self::Cheat)
    }

    fn train_only(&self) -> bool {
        match self {
            Self::Cv { train_only, .. }
            | Self::Loocv { train_only }
            | Self::IgnoreEraCv { train_only, .. }
            | Self::Fraction { train_only, .. }
            | Self::ConsecutiveCv { train_only, .. }
            | Self::Roll { train_only, .. } => *train_only,
            _ => false,
        }
    }

    /// Check the parameters that do not depend on the data.
    pub fn validate(&self) -> SplitResult<()> {
        match *self {
            Self::Cv { kfold, .. }
            | Self::IgnoreEraCv { kfold, .. }
            | Self::ConsecutiveCv { kfold, .. } => {
                if kfold < 2 {
                    return Err(SplitError::Config(format!(
                        "{}: kfold must be at least 2, got {}",
                        self.name(),
                        kfold
                    )));
                }
            }
            Self::Fraction { fit_fraction, .. } => {
                if !(fit_fraction > 0.0 && fit_fraction < 1.0) {
                    return Err(SplitError::Config(format!(
                        "fraction: fit_fraction must be in (0, 1), got {}",
                        fit_fraction
                    )));
                }
            }
            Self::Roll {
                fit_window,
                predict_window,
                step,
                ..
            } => {
                if fit_window == 0 || predict_window == 0 || step == 0 {
                    return Err(SplitError::Config(format!(
                        "roll: windows and step must be positive, got fit_window={} predict_window={} step={}",
                        fit_window, predict_window, step
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// The view this strategy's fold selections are relative to.
    pub fn base(&self, data: &Data) -> Data {
        match self {
            Self::IgnoreEraCv { tournament, .. } => {
                let rows = if self.train_only() {
                    data.train()
                } else {
                    data.clone()
                };
                rows.with_target(*tournament)
            }
            _ if self.train_only() => data.train(),
            _ => data.clone(),
        }
    }

    /// Resolve the strategy against `base` into one plan per fold.
    pub fn plan(&self, base: &Data) -> SplitResult<Vec<FoldPlan>> {
        self.validate()?;
        let plans = match *self {
            Self::Tournament => vec![FoldPlan::new(
                Selection::Regions(&[Region::Train]),
                Selection::Regions(Region::TOURNAMENT),
            )],
            Self::Flip => vec![FoldPlan::new(
                Selection::Regions(Region::TOURNAMENT),
                Selection::Regions(&[Region::Train]),
            )],
            Self::Validation => vec![FoldPlan::new(
                Selection::Regions(&[Region::Train]),
                Selection::Regions(&[Region::Validation]),
            )],
            Self::Cheat => vec![FoldPlan::new(Selection::All, Selection::All)],
            Self::Cv { kfold, .. } => {
                let eras = base.unique_eras();
                self.check_groups(kfold, eras.len(), "eras")?;
                hold_out_groups(&eras, round_robin(&eras, kfold))
            }
            Self::ConsecutiveCv { kfold, .. } => {
                let eras = base.unique_eras();
                self.check_groups(kfold, eras.len(), "eras")?;
                hold_out_groups(&eras, consecutive_blocks(&eras, kfold))
            }
            Self::Loocv { .. } => {
                let eras = base.unique_eras();
                if eras.len() < 2 {
                    return Err(SplitError::Config(format!(
                        "loocv: needs at least 2 eras, got {}",
                        eras.len()
                    )));
                }
                let groups = eras.iter().map(|era| vec![*era]).collect();
                hold_out_groups(&eras, groups)
            }
            Self::IgnoreEraCv { kfold, .. } => {
                let n = base.len();
                self.check_groups(kfold, n, "rows")?;
                let mut plans = Vec::with_capacity(kfold);
                for range in block_bounds(n, kfold) {
                    let fit: Vec<usize> = (0..range.start).chain(range.end..n).collect();
                    let predict: Vec<usize> = range.collect();
                    plans.push(FoldPlan::new(
                        Selection::View(base.select_rows(&fit)?),
                        Selection::View(base.select_rows(&predict)?),
                    ));
                }
                plans
            }
            Self::Fraction { fit_fraction, .. } => {
                let eras = base.unique_eras();
                let point = fraction_split_point(eras.len(), fit_fraction);
                if point == 0 || point == eras.len() {
                    return Err(SplitError::Config(format!(
                        "fraction: fit_fraction {} of {} eras leaves one side empty",
                        fit_fraction,
                        eras.len()
                    )));
                }
                vec![FoldPlan::new(
                    Selection::Eras(eras[..point].to_vec()),
                    Selection::Eras(eras[point..].to_vec()),
                )]
            }
            Self::Roll {
                fit_window,
                predict_window,
                step,
                ..
            } => {
                let eras = base.unique_eras();
                roll_windows(eras.len(), fit_window, predict_window, step)
                    .into_iter()
                    .map(|w| {
                        FoldPlan::new(
                            Selection::Eras(eras[w.fit].to_vec()),
                            Selection::Eras(eras[w.predict].to_vec()),
                        )
                    })
                    .collect()
            }
        };
        Ok(plans)
    }

    fn check_groups(&self, kfold: usize, available: usize, unit: &str) -> SplitResult<()> {
        if kfold > available {
            return Err(SplitError::Config(format!(
                "{}: kfold {} exceeds the {} available {}",
                self.name(),
                kfold,
                available,
                unit
            )));
        }
        Ok(())
    }
}

impl fmt::Display for SplitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cv { kfold, .. } | Self::ConsecutiveCv { kfold, .. } => {
                write!(f, "{}(kfold={})", self.name(), kfold)
            }
            Self::IgnoreEraCv {
                kfold, tournament, ..
            } => write!(f, "{}(kfold={}, tournament={})", self.name(), kfold, tournament),
            Self::Fraction { fit_fraction, .. } => {
                write!(f, "{}(fit_fraction={})", self.name(), fit_fraction)
            }
            Self::Roll {
                fit_window,
                predict_window,
                step,
                ..
            } => write!(
                f,
                "{}(fit_window={}, predict_window={}, step={})",
                self.name(),
                fit_window,
                predict_window,
                step
            ),
            _ => f.write_str(self.name()),
        }
    }
}

/// Each group is held out once; everything else is fit.
fn hold_out_groups(eras: &[Era], groups: Vec<Vec<Era>>) -> Vec<FoldPlan> {
    groups
        .into_iter()
        .map(|group| {
            let held: HashSet<Era> = group.iter().copied().collect();
            let fit = eras.iter().copied().filter(|e| !held.contains(e)).collect();
            FoldPlan::new(Selection::Eras(fit), Selection::Eras(group))
        })
        .collect()
}

/// Rows one side of a fold takes from the base view.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    All,
    Regions(&'static [Region]),
    Eras(Vec<Era>),
    /// Precomputed row selection.
    View(Data),
}

impl Selection {
    pub fn apply(&self, base: &Data) -> Data {
        match self {
            Self::All => base.clone(),
            Self::Regions(regions) => base.regions(regions),
            Self::Eras(eras) => base.select_eras(eras),
            Self::View(view) => view.clone(),
        }
    }
}

/// Fit and predict selections of a single fold.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldPlan {
    pub fit: Selection,
    pub predict: Selection,
}

impl FoldPlan {
    pub fn new(fit: Selection, predict: Selection) -> Self {
        Self { fit, predict }
    }
}
