//! Fit/predict splitters.
//!
//! Strategies cut an era-labeled dataset into (fit, predict) folds:
//! - Single fold: tournament, flip, validation, cheat, fraction
//! - K-fold: cv (round-robin eras), consecutive_cv (era blocks),
//!   loocv (one era per fold), ignore_era_cv (row blocks)
//! - Rolling: roll (adjacent fit/predict era windows)

pub mod audit;
pub mod error;
pub mod folds;
pub mod groups;
pub mod strategy;

pub use audit::{FoldSummary, SplitReport};
pub use error::{SplitError, SplitResult};
pub use folds::{Fold, Folds, Splitter, SplitterState};
pub use groups::{block_bounds, consecutive_blocks, roll_fold_count, roll_windows, round_robin, RollWindow};
pub use strategy::{FoldPlan, Selection, SplitStrategy};
