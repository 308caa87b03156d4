pub mod dataset;
pub mod loader;
pub mod types;

pub use dataset::{Data, DataError, DataResult, DataSummary, Frame, Row, RowRef, N_TOURNAMENTS};
pub use loader::{frame_from_dataframe, DataLoader};
pub use types::{Era, Region, Tournament};
