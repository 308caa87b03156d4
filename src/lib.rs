pub mod data;
pub mod splitter;

// Re-export commonly used types
pub use data::{Data, DataError, DataLoader, Era, Region, Row, Tournament};
pub use splitter::{Fold, SplitError, SplitReport, SplitStrategy, Splitter, SplitterState};
