#[cfg(feature = "odbc")]
pub mod odbc;

use crate::error::{Result, StatementError};
use crate::result::ResultSet;
use crate::statement::options::ResultSetConcurrency;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[cfg(feature = "odbc")]
pub use odbc::OdbcSession;

/// The session a statement dispatches through.
///
/// Catalog and row-limit are session-global state. Every call a statement
/// makes happens while it holds the `Mutex` of its [`SharedConnection`], so
/// the catalog swap, limit directive and dispatch of one statement are
/// never interleaved with another statement's.
pub trait Connection: Send {
    /// Sends one command and returns the response. `max_rows` is `-1` when
    /// no explicit cap applies.
    fn execute(
        &mut self,
        sql: &str,
        max_rows: i32,
        concurrency: ResultSetConcurrency,
        streaming: bool,
        is_query: bool,
    ) -> Result<ResultSet>;

    fn catalog(&self) -> Result<String>;

    fn set_catalog(&mut self, catalog: &str) -> Result<()>;

    fn is_read_only(&self) -> bool;

    fn auto_commit(&self) -> bool;

    fn rollback(&mut self) -> Result<()>;

    /// True once any statement on this session asked for a row cap.
    fn use_max_rows(&self) -> bool;

    fn max_rows_changed(&mut self);

    fn max_allowed_packet(&self) -> usize;

    fn is_closed(&self) -> bool;
}

pub type SharedConnection = Arc<Mutex<dyn Connection>>;
pub type WeakConnection = Weak<Mutex<dyn Connection>>;

pub(crate) fn lock_connection(
    conn: &SharedConnection,
) -> Result<MutexGuard<'_, dyn Connection + 'static>> {
    conn.lock()
        .map_err(|_| StatementError::InternalError("Failed to lock connection mutex".to_string()))
}
