//! In-memory connection for exercising statements without a server.
//!
//! `ScriptedConnection` records every dispatch together with the catalog
//! that was active at the time. Responses come from rules matched by
//! substring, in registration order; unmatched text starting with `S`
//! yields a one-row result and anything else an update count of 1.

use crate::connection::Connection;
use crate::error::{Result, StatementError};
use crate::protocol::{RowBuffer, SqlType};
use crate::result::ResultSet;
use crate::statement::limits;
use crate::statement::options::{ResultSetConcurrency, DEFAULT_MAX_PACKET, UNKNOWN_INSERT_ID};

/// Loads `.env` from the working directory, if any.
#[cfg(feature = "test-helpers")]
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

type Responder = Box<dyn Fn(&str) -> Result<ResultSet> + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub sql: String,
    pub max_rows: i32,
    pub concurrency: ResultSetConcurrency,
    pub streaming: bool,
    pub is_query: bool,
    pub catalog: String,
}

pub struct ScriptedConnection {
    catalog: String,
    read_only: bool,
    auto_commit: bool,
    use_max_rows: bool,
    max_allowed_packet: usize,
    closed: bool,
    fail_rollback: bool,
    fail_catalog_change_to: Option<String>,
    responders: Vec<(String, Responder)>,
    dispatched: Vec<DispatchRecord>,
    catalog_changes: Vec<String>,
    rollbacks: usize,
    max_rows_notifications: usize,
}

impl ScriptedConnection {
    pub fn new(catalog: &str) -> Self {
        Self {
            catalog: catalog.to_string(),
            read_only: false,
            auto_commit: true,
            use_max_rows: false,
            max_allowed_packet: DEFAULT_MAX_PACKET,
            closed: false,
            fail_rollback: false,
            fail_catalog_change_to: None,
            responders: Vec::new(),
            dispatched: Vec::new(),
            catalog_changes: Vec::new(),
            rollbacks: 0,
            max_rows_notifications: 0,
        }
    }

    pub fn with_max_allowed_packet(mut self, bytes: usize) -> Self {
        self.max_allowed_packet = bytes;
        self
    }

    pub fn with_auto_commit(mut self, enabled: bool) -> Self {
        self.auto_commit = enabled;
        self
    }

    pub fn with_use_max_rows(mut self, enabled: bool) -> Self {
        self.use_max_rows = enabled;
        self
    }

    pub fn with_failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    /// Makes `set_catalog(catalog)` fail.
    pub fn with_failing_catalog(mut self, catalog: &str) -> Self {
        self.fail_catalog_change_to = Some(catalog.to_string());
        self
    }

    pub fn respond_with<F>(mut self, pattern: &str, responder: F) -> Self
    where
        F: Fn(&str) -> Result<ResultSet> + Send + 'static,
    {
        self.responders.push((pattern.to_string(), Box::new(responder)));
        self
    }

    pub fn respond_with_rows(self, pattern: &str, rows: RowBuffer) -> Self {
        self.respond_with(pattern, move |_| Ok(ResultSet::with_rows(rows.clone())))
    }

    pub fn respond_with_update(self, pattern: &str, count: i64, generated_key: i64) -> Self {
        self.respond_with(pattern, move |_| Ok(ResultSet::update(count, generated_key)))
    }

    pub fn fail_on(self, pattern: &str, sqlstate: [u8; 5], native_code: i32, message: &str) -> Self {
        let message = message.to_string();
        self.respond_with(pattern, move |_| {
            Err(StatementError::Structured {
                sqlstate,
                native_code,
                message: message.clone(),
            })
        })
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_auto_commit(&mut self, enabled: bool) {
        self.auto_commit = enabled;
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }

    pub fn dispatched(&self) -> &[DispatchRecord] {
        &self.dispatched
    }

    pub fn dispatched_sql(&self) -> Vec<String> {
        self.dispatched.iter().map(|r| r.sql.clone()).collect()
    }

    /// Every catalog passed to `set_catalog`, in order.
    pub fn catalog_changes(&self) -> &[String] {
        &self.catalog_changes
    }

    pub fn rollback_count(&self) -> usize {
        self.rollbacks
    }

    pub fn max_rows_notifications(&self) -> usize {
        self.max_rows_notifications
    }

    fn default_response(sql: &str) -> ResultSet {
        if limits::is_query(sql) {
            let mut rows = RowBuffer::new();
            rows.add_column("1".to_string(), SqlType::Integer);
            rows.add_row(vec![Some(b"1".to_vec())]);
            ResultSet::with_rows(rows)
        } else {
            ResultSet::update(1, UNKNOWN_INSERT_ID)
        }
    }
}

impl Connection for ScriptedConnection {
    fn execute(
        &mut self,
        sql: &str,
        max_rows: i32,
        concurrency: ResultSetConcurrency,
        streaming: bool,
        is_query: bool,
    ) -> Result<ResultSet> {
        if self.closed {
            return Err(StatementError::ConnectionClosed);
        }

        self.dispatched.push(DispatchRecord {
            sql: sql.to_string(),
            max_rows,
            concurrency,
            streaming,
            is_query,
            catalog: self.catalog.clone(),
        });

        match self
            .responders
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
        {
            Some((_, responder)) => responder(sql),
            None => Ok(Self::default_response(sql)),
        }
    }

    fn catalog(&self) -> Result<String> {
        Ok(self.catalog.clone())
    }

    fn set_catalog(&mut self, catalog: &str) -> Result<()> {
        if self.fail_catalog_change_to.as_deref() == Some(catalog) {
            return Err(StatementError::Structured {
                sqlstate: *b"42000",
                native_code: 1049,
                message: format!("Unknown database '{}'", catalog),
            });
        }
        self.catalog_changes.push(catalog.to_string());
        self.catalog = catalog.to_string();
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn rollback(&mut self) -> Result<()> {
        self.rollbacks += 1;
        if self.fail_rollback {
            return Err(StatementError::Structured {
                sqlstate: *b"08S01",
                native_code: 2013,
                message: "Lost connection during rollback".to_string(),
            });
        }
        Ok(())
    }

    fn use_max_rows(&self) -> bool {
        self.use_max_rows
    }

    fn max_rows_changed(&mut self) {
        self.max_rows_notifications += 1;
        self.use_max_rows = true;
    }

    fn max_allowed_packet(&self) -> usize {
        self.max_allowed_packet
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
