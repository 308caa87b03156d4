//! Era grouping and window arithmetic.
//!
//! Pure functions from an ordered sequence (usually the canonical era list)
//! to the groups or windows a strategy holds out. Strategies only differ in
//! which of these functions they call.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Assign item `i` to group `i % k`.
pub fn round_robin<T: Copy>(items: &[T], k: usize) -> Vec<Vec<T>> {
    let mut groups = vec![Vec::new(); k];
    if k == 0 {
        return groups;
    }
    for (i, item) in items.iter().enumerate() {
        groups[i % k].push(*item);
    }
    groups
}

/// Cut `0..n` into `k` contiguous ranges whose lengths differ by at most one.
///
/// The first `n % k` ranges hold the extra item, so range 0 always has
/// `ceil(n / k)` items and no range is empty while `k <= n`.
pub fn block_bounds(n: usize, k: usize) -> Vec<Range<usize>> {
    if k == 0 {
        return Vec::new();
    }
    let base = n / k;
    let extra = n % k;
    let mut bounds = Vec::with_capacity(k);
    let mut start = 0;
    for g in 0..k {
        let len = base + usize::from(g < extra);
        bounds.push(start..start + len);
        start += len;
    }
    bounds
}

/// Split items into `k` contiguous blocks, preserving order.
pub fn consecutive_blocks<T: Copy>(items: &[T], k: usize) -> Vec<Vec<T>> {
    block_bounds(items.len(), k)
        .into_iter()
        .map(|range| items[range].to_vec())
        .collect()
}

/// Number of items that go to the fit side of a fractional split.
///
/// Rounds down: `floor(fit_fraction * n)`.
pub fn fraction_split_point(n: usize, fit_fraction: f64) -> usize {
    let point = (n as f64 * fit_fraction).floor();
    if point <= 0.0 {
        0
    } else {
        (point as usize).min(n)
    }
}

/// One position of the rolling fit/predict window pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollWindow {
    /// Window number (0-indexed).
    pub index: usize,
    /// Positions of the fit eras.
    pub fit: Range<usize>,
    /// Positions of the predict eras.
    pub predict: Range<usize>,
}

/// Number of complete window pairs that fit in `era_count` eras.
///
/// `floor((era_count - fit_window - predict_window) / step) + 1`, or zero
/// when a single pair does not fit (including window sums past `usize::MAX`).
pub fn roll_fold_count(
    era_count: usize,
    fit_window: usize,
    predict_window: usize,
    step: usize,
) -> usize {
    let required = match fit_window.checked_add(predict_window) {
        Some(required) => required,
        None => return 0,
    };
    if step == 0 || era_count < required {
        return 0;
    }
    (era_count - required) / step + 1
}

/// Generate every complete window pair, advancing the cursor by `step`.
pub fn roll_windows(
    era_count: usize,
    fit_window: usize,
    predict_window: usize,
    step: usize,
) -> Vec<RollWindow> {
    let count = roll_fold_count(era_count, fit_window, predict_window, step);
    (0..count)
        .map(|index| {
            let start = index * step;
            let fit_end = start + fit_window;
            RollWindow {
                index,
                fit: start..fit_end,
                predict: fit_end..fit_end + predict_window,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let groups = round_robin(&[1, 2, 3, 4, 5], 2);
        assert_eq!(groups, vec![vec![1, 3, 5], vec![2, 4]]);
    }

    #[test]
    fn test_round_robin_one_per_group() {
        let groups = round_robin(&[1, 2, 3], 3);
        assert_eq!(groups, vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_block_bounds_uneven() {
        assert_eq!(block_bounds(10, 4), vec![0..3, 3..6, 6..8, 8..10]);
        // Pure ceil-sized blocks would leave the last group empty here.
        assert_eq!(block_bounds(5, 4), vec![0..2, 2..3, 3..4, 4..5]);
    }

    #[test]
    fn test_block_bounds_cover_everything() {
        for n in 1..20 {
            for k in 1..=n {
                let bounds = block_bounds(n, k);
                assert_eq!(bounds.len(), k);
                assert_eq!(bounds[0].start, 0);
                assert_eq!(bounds[k - 1].end, n);
                assert!(bounds.iter().all(|r| !r.is_empty()));
                assert!(bounds.windows(2).all(|w| w[0].end == w[1].start));
            }
        }
    }

    #[test]
    fn test_consecutive_blocks() {
        let blocks = consecutive_blocks(&['a', 'b', 'c', 'd', 'e'], 2);
        assert_eq!(blocks, vec![vec!['a', 'b', 'c'], vec!['d', 'e']]);
    }

    #[test]
    fn test_fraction_split_point_rounds_down() {
        assert_eq!(fraction_split_point(10, 0.5), 5);
        assert_eq!(fraction_split_point(5, 0.5), 2);
        assert_eq!(fraction_split_point(3, 0.99), 2);
        assert_eq!(fraction_split_point(3, 0.1), 0);
    }

    #[test]
    fn test_roll_fold_count() {
        assert_eq!(roll_fold_count(5, 3, 1, 1), 2);
        assert_eq!(roll_fold_count(100, 15, 10, 15), 6);
        assert_eq!(roll_fold_count(3, 3, 1, 1), 0);
        assert_eq!(roll_fold_count(4, 3, 1, 7), 1);
    }

    #[test]
    fn test_roll_fold_count_with_huge_windows() {
        assert_eq!(roll_fold_count(5, usize::MAX, 1, 1), 0);
        assert_eq!(roll_fold_count(5, 1, usize::MAX, 1), 0);
        assert_eq!(roll_fold_count(usize::MAX, usize::MAX - 1, 1, 1), 1);
        assert!(roll_windows(5, usize::MAX, 1, 1).is_empty());
    }

    #[test]
    fn test_roll_windows() {
        let windows = roll_windows(5, 3, 1, 1);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].fit, 0..3);
        assert_eq!(windows[0].predict, 3..4);
        assert_eq!(windows[1].fit, 1..4);
        assert_eq!(windows[1].predict, 4..5);
    }

    #[test]
    fn test_roll_windows_stop_before_partial_window() {
        let windows = roll_windows(12, 4, 3, 3);
        assert_eq!(windows.len(), 2);
        assert!(windows.iter().all(|w| w.predict.end <= 12));
        assert!(windows.iter().all(|w| w.fit.end == w.predict.start));
    }
}
