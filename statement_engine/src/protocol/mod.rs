pub mod row_buffer;
pub mod types;
pub mod warning;

pub use row_buffer::{ColumnMetadata, RowBuffer};
pub use types::SqlType;
pub use warning::{SqlWarning, WarningIter};
