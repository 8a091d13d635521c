pub mod config;
pub mod connection;
mod error;
pub mod escape;
pub mod observability;
pub mod protocol;
pub mod result;
pub mod statement;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(feature = "odbc")]
pub use connection::OdbcSession;
pub use config::StatementConfig;
pub use connection::{Connection, SharedConnection, WeakConnection};
pub use error::{ErrorCategory, Result, StatementError, StructuredError};
pub use escape::{EscapeProcessor, JdbcEscapeProcessor};
pub use protocol::{ColumnMetadata, RowBuffer, SqlType, SqlWarning};
pub use result::ResultSet;
pub use statement::options::{
    FetchDirection, GeneratedKeys, Holdability, MoreResults, ResultSetConcurrency, ResultSetType,
};
pub use statement::Statement;
