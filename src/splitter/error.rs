use thiserror::Error;

use crate::data::DataError;

#[derive(Error, Debug)]
pub enum SplitError {
    /// Strategy parameters rejected at construction.
    #[error("Invalid splitter configuration: {0}")]
    Config(String),

    /// A fold plan broke one of the partition guarantees.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

pub type SplitResult<T> = Result<T, SplitError>;
