//! Builders around the scripted in-memory connection.

use statement_engine::test_helpers::ScriptedConnection;
use statement_engine::{RowBuffer, SharedConnection, SqlType};
use std::sync::{Arc, Mutex};

/// Returns the concrete handle for inspection and the shared trait object
/// statements bind to. Both point at the same connection.
pub fn shared(conn: ScriptedConnection) -> (Arc<Mutex<ScriptedConnection>>, SharedConnection) {
    let handle = Arc::new(Mutex::new(conn));
    let shared: SharedConnection = handle.clone();
    (handle, shared)
}

pub fn text_rows(column: &str, values: &[&str]) -> RowBuffer {
    let mut rows = RowBuffer::new();
    rows.add_column(column.to_string(), SqlType::Varchar);
    for value in values {
        rows.add_row(vec![Some(value.as_bytes().to_vec())]);
    }
    rows
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
