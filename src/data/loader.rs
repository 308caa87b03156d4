//! Polars bridge from tournament files to a backing [`Frame`].
//!
//! The dataset provider publishes one row per id with the following columns:
//! - id, era, data_type (train / validation / test / live)
//! - feature1 ... featureN
//! - target_<tournament> for each tournament (missing on unlabeled rows)
//!
//! Parquet and CSV files are both accepted; the splitters only ever see the
//! resulting [`Data`] view.

use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use super::dataset::{Data, DataError, DataResult, Frame, N_TOURNAMENTS};
use super::types::{Era, Region, Tournament};

/// Columns every tournament file must carry.
pub const REQUIRED_COLUMNS: &[&str] = &["id", "era", "data_type"];

/// Prefix shared by all feature columns.
pub const FEATURE_PREFIX: &str = "feature";

/// File loader for tournament datasets.
pub struct DataLoader {
    path: String,
}

impl DataLoader {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    fn is_csv(&self) -> bool {
        Path::new(&self.path)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false)
    }

    /// Scan the file as a LazyFrame.
    pub fn load_lazy(&self) -> DataResult<LazyFrame> {
        if !Path::new(&self.path).exists() {
            return Err(DataError::FileNotFound(self.path.clone()));
        }
        let lf = if self.is_csv() {
            LazyCsvReader::new(&self.path).with_has_header(true).finish()?
        } else {
            LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())?
        };
        Ok(lf)
    }

    pub fn load_dataframe(&self) -> DataResult<DataFrame> {
        Ok(self.load_lazy()?.collect()?)
    }

    /// Load the file into a view over all of its rows.
    pub fn load(&self) -> DataResult<Data> {
        let df = self.load_dataframe()?;
        info!("Loaded {} rows from {}", df.height(), self.path);
        Ok(Data::new(frame_from_dataframe(&df)?))
    }
}

/// Convert a tournament DataFrame into a backing frame.
pub fn frame_from_dataframe(df: &DataFrame) -> DataResult<Frame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.as_str().to_string())
        .collect();
    for required in REQUIRED_COLUMNS {
        if !names.iter().any(|n| n == required) {
            return Err(DataError::MissingColumn(required.to_string()));
        }
    }

    let height = df.height();

    let ids = df
        .column("id")?
        .str()?
        .into_iter()
        .enumerate()
        .map(|(idx, id)| {
            id.map(str::to_string)
                .ok_or_else(|| DataError::InvalidLabel(format!("missing id at row {}", idx)))
        })
        .collect::<DataResult<Vec<_>>>()?;

    let eras = read_eras(df.column("era")?)?;

    let regions = df
        .column("data_type")?
        .str()?
        .into_iter()
        .map(|label| {
            let label = label.unwrap_or_default();
            Region::from_str(label)
                .ok_or_else(|| DataError::InvalidLabel(format!("data_type '{}'", label)))
        })
        .collect::<DataResult<Vec<_>>>()?;

    let feature_names: Vec<&String> = names
        .iter()
        .filter(|n| n.starts_with(FEATURE_PREFIX))
        .collect();
    let n_features = feature_names.len();
    debug!("Found {} feature columns", n_features);

    let mut x = vec![f32::NAN; height * n_features];
    for (j, name) in feature_names.iter().enumerate() {
        let casted = df.column(name.as_str())?.cast(&DataType::Float32)?;
        for (i, value) in casted.f32()?.into_iter().enumerate() {
            if let Some(v) = value {
                x[i * n_features + j] = v;
            }
        }
    }

    let mut targets = vec![[None; N_TOURNAMENTS]; height];
    for tournament in Tournament::ALL {
        let name = tournament.target_column();
        if !names.contains(&name) {
            continue;
        }
        let casted = df.column(&name)?.cast(&DataType::Float32)?;
        for (i, value) in casted.f32()?.into_iter().enumerate() {
            targets[i][tournament.index()] = value;
        }
    }

    Frame::from_columns(ids, eras, regions, n_features, x, targets)
}

/// Era labels may be stored as `era12` strings or as plain integers.
fn read_eras(column: &Column) -> DataResult<Vec<Era>> {
    if let Ok(labels) = column.str() {
        return labels
            .into_iter()
            .map(|label| label.unwrap_or_default().parse::<Era>())
            .collect();
    }
    let casted = column.cast(&DataType::Int64)?;
    casted
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(idx, number)| match number {
            Some(n) if n >= 0 && n <= u32::MAX as i64 => Ok(Era::new(n as u32)),
            _ => Err(DataError::InvalidLabel(format!("era at row {}", idx))),
        })
        .collect()
}
