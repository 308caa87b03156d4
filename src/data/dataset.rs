//! Immutable tournament dataset and index-based views over it.
//!
//! A [`Frame`] owns the row payload (ids, era and region labels, features
//! and targets) and is never mutated once built. A [`Data`] view is an
//! `Arc` to the frame plus the list of frame rows it selects, so selecting,
//! splitting and cloning a view only ever copies row indices.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Era, Region, Tournament};

/// Number of tournaments a row carries targets for.
pub const N_TOURNAMENTS: usize = Tournament::ALL.len();

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Duplicate row id: {0}")]
    DuplicateId(String),

    #[error("Column '{column}' has {got} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Row {row} has {got} features, expected {expected}")]
    FeatureWidth {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Row index {index} out of range for view of {len} rows")]
    RowOutOfRange { index: usize, len: usize },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

pub type DataResult<T> = Result<T, DataError>;

/// One row handed to the frame builder by a dataset provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    pub era: Era,
    pub region: Region,
    pub features: Vec<f32>,
    pub targets: [Option<f32>; N_TOURNAMENTS],
}

impl Row {
    /// Create a row without targets.
    pub fn new(id: impl Into<String>, era: Era, region: Region, features: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            era,
            region,
            features,
            targets: [None; N_TOURNAMENTS],
        }
    }

    /// Set the target for one tournament.
    pub fn with_target(mut self, tournament: Tournament, target: f32) -> Self {
        self.targets[tournament.index()] = Some(target);
        self
    }
}

/// Borrowed view of a single row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowRef<'a> {
    pub id: &'a str,
    pub era: Era,
    pub region: Region,
    pub features: &'a [f32],
    pub targets: &'a [Option<f32>; N_TOURNAMENTS],
}

impl RowRef<'_> {
    pub fn target(&self, tournament: Tournament) -> Option<f32> {
        self.targets[tournament.index()]
    }
}

/// Column-oriented backing storage shared by every view.
#[derive(Debug)]
pub struct Frame {
    ids: Vec<String>,
    eras: Vec<Era>,
    regions: Vec<Region>,
    n_features: usize,
    /// Row-major feature matrix, `len() * n_features` values.
    x: Vec<f32>,
    targets: Vec<[Option<f32>; N_TOURNAMENTS]>,
}

impl Frame {
    /// Build a frame from columns, validating lengths and id uniqueness.
    pub fn from_columns(
        ids: Vec<String>,
        eras: Vec<Era>,
        regions: Vec<Region>,
        n_features: usize,
        x: Vec<f32>,
        targets: Vec<[Option<f32>; N_TOURNAMENTS]>,
    ) -> DataResult<Self> {
        let n = ids.len();
        check_len("era", n, eras.len())?;
        check_len("data_type", n, regions.len())?;
        check_len("target", n, targets.len())?;
        check_len("features", n * n_features, x.len())?;

        if n > u32::MAX as usize {
            return Err(DataError::Invariant(format!(
                "{} rows exceed the addressable row count",
                n
            )));
        }

        let mut seen = HashSet::with_capacity(n);
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(DataError::DuplicateId(id.clone()));
            }
        }

        Ok(Self {
            ids,
            eras,
            regions,
            n_features,
            x,
            targets,
        })
    }

    /// Build a frame from rows. The first row fixes the feature width.
    pub fn from_rows(rows: Vec<Row>) -> DataResult<Self> {
        let n_features = rows.first().map(|r| r.features.len()).unwrap_or(0);
        let mut ids = Vec::with_capacity(rows.len());
        let mut eras = Vec::with_capacity(rows.len());
        let mut regions = Vec::with_capacity(rows.len());
        let mut x = Vec::with_capacity(rows.len() * n_features);
        let mut targets = Vec::with_capacity(rows.len());

        for (idx, row) in rows.into_iter().enumerate() {
            if row.features.len() != n_features {
                return Err(DataError::FeatureWidth {
                    row: idx,
                    expected: n_features,
                    got: row.features.len(),
                });
            }
            ids.push(row.id);
            eras.push(row.era);
            regions.push(row.region);
            x.extend_from_slice(&row.features);
            targets.push(row.targets);
        }

        Self::from_columns(ids, eras, regions, n_features, x, targets)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn row(&self, idx: usize) -> RowRef<'_> {
        RowRef {
            id: &self.ids[idx],
            era: self.eras[idx],
            region: self.regions[idx],
            features: &self.x[idx * self.n_features..(idx + 1) * self.n_features],
            targets: &self.targets[idx],
        }
    }
}

fn check_len(column: &str, expected: usize, got: usize) -> DataResult<()> {
    if expected != got {
        return Err(DataError::LengthMismatch {
            column: column.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

/// Read-only selection of rows from a shared [`Frame`].
///
/// Views are cheap to clone and safe to share across threads. Two views are
/// equal when they select the same rows of the same frame in the same order.
#[derive(Clone)]
pub struct Data {
    frame: Arc<Frame>,
    rows: Arc<[u32]>,
}

impl Data {
    /// View selecting every row of `frame`.
    pub fn new(frame: Frame) -> Self {
        let rows: Arc<[u32]> = (0..frame.len() as u32).collect();
        Self {
            frame: Arc::new(frame),
            rows,
        }
    }

    /// Build a frame from rows and view all of it.
    pub fn from_rows(rows: Vec<Row>) -> DataResult<Self> {
        Ok(Self::new(Frame::from_rows(rows)?))
    }

    fn with_rows(&self, rows: Vec<u32>) -> Self {
        Self {
            frame: Arc::clone(&self.frame),
            rows: rows.into(),
        }
    }

    fn filter<F>(&self, keep: F) -> Self
    where
        F: Fn(usize) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .copied()
            .filter(|&r| keep(r as usize))
            .collect();
        self.with_rows(rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.frame.n_features
    }

    /// Whether both views select from the same backing frame.
    pub fn same_frame(&self, other: &Data) -> bool {
        Arc::ptr_eq(&self.frame, &other.frame)
    }

    /// Frame row indices selected by this view, in view order.
    pub fn frame_rows(&self) -> &[u32] {
        &self.rows
    }

    /// Row at position `idx` of this view.
    pub fn row(&self, idx: usize) -> Option<RowRef<'_>> {
        self.rows
            .get(idx)
            .map(|&r| self.frame.row(r as usize))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.rows.iter().map(move |&r| self.frame.row(r as usize))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |&r| self.frame.ids[r as usize].as_str())
    }

    /// Era label of every row, in view order.
    pub fn eras(&self) -> impl Iterator<Item = Era> + '_ {
        self.rows.iter().map(move |&r| self.frame.eras[r as usize])
    }

    /// Distinct eras present in the view, in canonical (ascending) order.
    pub fn unique_eras(&self) -> Vec<Era> {
        let mut eras: Vec<Era> = self.eras().collect();
        eras.sort_unstable();
        eras.dedup();
        eras
    }

    /// Row count per era, in canonical era order.
    pub fn era_counts(&self) -> BTreeMap<Era, usize> {
        let mut counts = BTreeMap::new();
        for era in self.eras() {
            *counts.entry(era).or_insert(0) += 1;
        }
        counts
    }

    /// Rows whose era is in `eras`, preserving row order.
    pub fn select_eras(&self, eras: &[Era]) -> Data {
        let wanted: HashSet<Era> = eras.iter().copied().collect();
        let frame = &self.frame;
        self.filter(|r| wanted.contains(&frame.eras[r]))
    }

    /// Rows whose era is not in `eras`, preserving row order.
    pub fn exclude_eras(&self, eras: &[Era]) -> Data {
        let unwanted: HashSet<Era> = eras.iter().copied().collect();
        let frame = &self.frame;
        self.filter(|r| !unwanted.contains(&frame.eras[r]))
    }

    /// Rows at the given positions of this view, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> DataResult<Data> {
        let mut rows = Vec::with_capacity(indices.len());
        for &idx in indices {
            let row = self.rows.get(idx).ok_or(DataError::RowOutOfRange {
                index: idx,
                len: self.rows.len(),
            })?;
            rows.push(*row);
        }
        Ok(self.with_rows(rows))
    }

    /// Append `other` after `self`.
    ///
    /// Both views must share a frame and select disjoint rows.
    pub fn concat(&self, other: &Data) -> DataResult<Data> {
        if !self.same_frame(other) {
            return Err(DataError::Invariant(
                "cannot concatenate views of different frames".to_string(),
            ));
        }
        let mine: HashSet<u32> = self.rows.iter().copied().collect();
        if let Some(&dup) = other.rows.iter().find(|r| mine.contains(*r)) {
            return Err(DataError::Invariant(format!(
                "cannot concatenate views sharing id '{}'",
                self.frame.ids[dup as usize]
            )));
        }
        let mut rows = Vec::with_capacity(self.len() + other.len());
        rows.extend_from_slice(&self.rows);
        rows.extend_from_slice(&other.rows);
        Ok(self.with_rows(rows))
    }

    pub fn region(&self, region: Region) -> Data {
        self.regions(&[region])
    }

    pub fn regions(&self, regions: &[Region]) -> Data {
        let frame = &self.frame;
        self.filter(|r| regions.contains(&frame.regions[r]))
    }

    pub fn train(&self) -> Data {
        self.region(Region::Train)
    }

    /// Validation, test and live rows.
    pub fn tournament(&self) -> Data {
        self.regions(Region::TOURNAMENT)
    }

    /// Rows that carry a target for `tournament`.
    pub fn with_target(&self, tournament: Tournament) -> Data {
        let frame = &self.frame;
        let t = tournament.index();
        self.filter(|r| frame.targets[r][t].is_some())
    }

    /// Row-major feature matrix of the view.
    pub fn x(&self) -> Vec<f32> {
        let width = self.frame.n_features;
        let mut out = Vec::with_capacity(self.len() * width);
        for &r in self.rows.iter() {
            let start = r as usize * width;
            out.extend_from_slice(&self.frame.x[start..start + width]);
        }
        out
    }

    /// Targets of one tournament, in view order.
    pub fn y(&self, tournament: Tournament) -> Vec<Option<f32>> {
        let t = tournament.index();
        self.rows
            .iter()
            .map(|&r| self.frame.targets[r as usize][t])
            .collect()
    }

    pub fn summary(&self) -> DataSummary {
        let mut regions = BTreeMap::new();
        for &r in self.rows.iter() {
            *regions.entry(self.frame.regions[r as usize]).or_insert(0) += 1;
        }
        let eras = self.unique_eras();
        DataSummary {
            rows: self.len(),
            eras: eras.len(),
            first_era: eras.first().copied(),
            last_era: eras.last().copied(),
            n_features: self.n_features(),
            regions,
        }
    }
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.same_frame(other) && self.rows == other.rows
    }
}

impl Eq for Data {}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("rows", &self.len())
            .field("eras", &self.unique_eras().len())
            .field("n_features", &self.n_features())
            .finish()
    }
}

/// Shape of a view: row, era and feature counts plus rows per region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSummary {
    pub rows: usize,
    pub eras: usize,
    pub first_era: Option<Era>,
    pub last_era: Option<Era>,
    pub n_features: usize,
    pub regions: BTreeMap<Region, usize>,
}
