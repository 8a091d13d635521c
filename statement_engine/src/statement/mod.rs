pub mod batch;
pub mod limits;
pub mod options;

use crate::config::StatementConfig;
use crate::connection::{lock_connection, Connection, SharedConnection, WeakConnection};
use crate::error::{Result, StatementError};
use crate::escape::{EscapeProcessor, JdbcEscapeProcessor};
use crate::observability::{get_global_metrics, Metrics, StatementKind, StructuredLogger};
use crate::protocol::SqlWarning;
use crate::result::ResultSet;
use log::Level;
use options::{
    FetchDirection, GeneratedKeys, Holdability, MoreResults, ResultSetConcurrency, ResultSetType,
    MAX_ROWS, STREAMING_FETCH_SIZE, UNKNOWN_INSERT_ID, UNLIMITED_ROWS,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

static NEXT_STATEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Executes SQL text over a shared connection.
///
/// A statement keeps only a weak reference to its connection and holds the
/// connection's mutex for the whole catalog swap, limit directive and
/// dispatch of each call. One statement is not meant to be driven from
/// several threads at once; `&mut self` on every operation enforces that.
///
/// Results live in two slots: the current result and a single lookahead
/// filled from the follow-on response of the latest execution. Deeper
/// chains are not kept.
pub struct Statement {
    id: u64,
    connection: Option<WeakConnection>,
    catalog: String,
    max_field_size: i32,
    max_rows: i32,
    fetch_size: i32,
    query_timeout_secs: i32,
    escape_processing: bool,
    result_set_type: ResultSetType,
    concurrency: ResultSetConcurrency,
    current: Option<ResultSet>,
    pending: Option<ResultSet>,
    retained: Vec<ResultSet>,
    batch: Vec<String>,
    last_insert_id: i64,
    warnings: Option<SqlWarning>,
    closed: bool,
    escaper: Arc<dyn EscapeProcessor>,
    metrics: Arc<Metrics>,
    logger: Arc<StructuredLogger>,
}

impl Statement {
    /// Binds to `conn` and its currently active catalog.
    pub fn new(conn: &SharedConnection) -> Result<Self> {
        let catalog = {
            let guard = lock_connection(conn)?;
            if guard.is_closed() {
                return Err(StatementError::ConnectionClosed);
            }
            guard.catalog()?
        };
        Self::with_catalog(conn, catalog)
    }

    pub fn with_catalog(conn: &SharedConnection, catalog: impl Into<String>) -> Result<Self> {
        let max_packet = {
            let guard = lock_connection(conn)?;
            if guard.is_closed() {
                return Err(StatementError::ConnectionClosed);
            }
            guard.max_allowed_packet()
        };

        Ok(Self {
            id: NEXT_STATEMENT_ID.fetch_add(1, Ordering::Relaxed),
            connection: Some(Arc::downgrade(conn)),
            catalog: catalog.into(),
            max_field_size: i32::try_from(max_packet).unwrap_or(i32::MAX),
            max_rows: UNLIMITED_ROWS,
            fetch_size: 0,
            query_timeout_secs: 0,
            escape_processing: true,
            result_set_type: ResultSetType::ForwardOnly,
            concurrency: ResultSetConcurrency::ReadOnly,
            current: None,
            pending: None,
            retained: Vec::new(),
            batch: Vec::new(),
            last_insert_id: UNKNOWN_INSERT_ID,
            warnings: None,
            closed: false,
            escaper: Arc::new(JdbcEscapeProcessor::new()),
            metrics: get_global_metrics(),
            logger: Arc::new(StructuredLogger::default()),
        })
    }

    pub fn with_config(conn: &SharedConnection, config: &StatementConfig) -> Result<Self> {
        let mut stmt = Self::new(conn)?;
        stmt.apply_config(config)?;
        Ok(stmt)
    }

    pub fn with_escape_processor(mut self, escaper: Arc<dyn EscapeProcessor>) -> Self {
        self.escaper = escaper;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_logger(mut self, logger: Arc<StructuredLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Runs every configured value through its validating setter.
    pub fn apply_config(&mut self, config: &StatementConfig) -> Result<()> {
        if let Some(max) = config.max_field_size {
            self.set_max_field_size(max)?;
        }
        // Only a non-zero limit switches the session into row-limit mode.
        if config.max_rows != 0 {
            self.set_max_rows(config.max_rows)?;
        }
        self.set_fetch_size(config.fetch_size)?;
        self.set_query_timeout(config.query_timeout_secs)?;
        self.set_escape_processing(config.escape_processing)?;
        self.set_result_set_type(config.result_set_type)?;
        self.set_result_set_concurrency(config.result_set_concurrency)?;
        Ok(())
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Fails on a closed statement, then on a statement whose connection
    /// has been dropped.
    fn check_closed(&self) -> Result<()> {
        if self.closed {
            return Err(StatementError::closed_statement());
        }
        match &self.connection {
            Some(weak) if weak.strong_count() > 0 => Ok(()),
            _ => Err(StatementError::ConnectionClosed),
        }
    }

    /// The owning connection, if it is still alive.
    pub fn connection(&self) -> Result<SharedConnection> {
        self.check_closed()?;
        self.connection
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(StatementError::ConnectionClosed)
    }

    pub fn catalog(&self) -> &str {
        &self.catalog
    }

    // ---- execution ---------------------------------------------------

    /// Runs any statement. Returns true when the new current result has rows.
    pub fn execute(&mut self, sql: &str) -> Result<bool> {
        let rs = self.run(sql, StatementKind::Execute)?;
        let has_rows = rs.really_result();
        self.rotate_in(rs);
        Ok(has_rows)
    }

    /// Key columns are not negotiated; the generated key is always captured.
    pub fn execute_returning_keys(&mut self, sql: &str, _keys: GeneratedKeys<'_>) -> Result<bool> {
        self.execute(sql)
    }

    pub fn execute_query(&mut self, sql: &str) -> Result<&mut ResultSet> {
        let mut rs = self.run(sql, StatementKind::Query)?;
        if !rs.really_result() {
            rs.close_quietly();
            self.rollback_quietly();
            return Err(StatementError::NotAQuery);
        }

        self.pending = Some(rs);
        self.promote_pending();

        self.current
            .as_mut()
            .ok_or_else(|| StatementError::InternalError("Query result was not bound".to_string()))
    }

    pub fn execute_update(&mut self, sql: &str) -> Result<i32> {
        let count = self.execute_large_update(sql)?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    pub fn execute_update_returning_keys(
        &mut self,
        sql: &str,
        _keys: GeneratedKeys<'_>,
    ) -> Result<i32> {
        self.execute_update(sql)
    }

    pub fn execute_large_update(&mut self, sql: &str) -> Result<i64> {
        let mut rs = self.run(sql, StatementKind::Update)?;
        if rs.really_result() {
            rs.close_quietly();
            self.rollback_quietly();
            return Err(StatementError::ExpectedUpdateGotRows);
        }

        let count = rs.update_count();
        self.rotate_in(rs);
        Ok(count)
    }

    /// Shared path of all three entry points; the returned packet is
    /// already bound to this statement and its key and warnings absorbed.
    fn run(&mut self, sql: &str, kind: StatementKind) -> Result<ResultSet> {
        self.check_closed()?;
        let conn = self.connection()?;

        if sql.trim().is_empty() {
            return Err(StatementError::InvalidArgument(
                "SQL statement cannot be empty".to_string(),
            ));
        }

        let read_only = {
            let guard = lock_connection(&conn)?;
            if guard.is_closed() {
                return Err(StatementError::ConnectionClosed);
            }
            guard.is_read_only()
        };
        if read_only {
            let allowed = match kind {
                StatementKind::Query => true,
                StatementKind::Execute => limits::is_query(sql),
                StatementKind::Update => false,
            };
            if !allowed {
                return Err(StatementError::ReadOnlyViolation);
            }
        }

        let sql = if self.escape_processing {
            self.escaper.rewrite(sql)?
        } else {
            sql.to_string()
        };

        self.warnings = None;
        self.release_current();
        self.replace_pending(None);

        let (query, streaming, concurrency) = match kind {
            StatementKind::Execute => (
                limits::is_query(&sql),
                self.is_streaming(),
                self.concurrency,
            ),
            StatementKind::Query => (true, self.is_streaming(), self.concurrency),
            StatementKind::Update => (false, false, ResultSetConcurrency::ReadOnly),
        };

        self.logger
            .log_statement(Level::Debug, &sql, &self.log_metadata(kind));

        let started = Instant::now();
        let outcome = {
            let mut guard = lock_connection(&conn)?;
            self.dispatch_in_catalog(&mut *guard, &sql, query, streaming, concurrency)
        };

        match outcome {
            Ok(mut rs) => {
                self.metrics.record_statement(kind, started.elapsed());
                rs.bind(self.id, self.result_set_type, self.concurrency);
                self.last_insert_id = rs.generated_key();
                self.warnings = rs.take_warnings();
                Ok(rs)
            }
            Err(e) => {
                self.metrics.record_error();
                self.logger.log_error(&e.to_string(), &self.log_metadata(kind));
                Err(e)
            }
        }
    }

    /// Swaps the connection to this statement's catalog for one dispatch
    /// and always swaps it back. Runs under the connection mutex.
    fn dispatch_in_catalog(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        query: bool,
        streaming: bool,
        concurrency: ResultSetConcurrency,
    ) -> Result<ResultSet> {
        let active = conn.catalog()?;
        let previous = if active != self.catalog {
            conn.set_catalog(&self.catalog)?;
            Some(active)
        } else {
            None
        };

        let outcome = self.dispatch_limited(conn, sql, query, streaming, concurrency);

        let Some(previous) = previous else {
            return outcome;
        };
        match conn.set_catalog(&previous) {
            Ok(()) => outcome,
            Err(restore_err) => {
                log::warn!(
                    "Failed to restore catalog '{}' after statement {}: {}",
                    previous,
                    self.id,
                    restore_err
                );
                match outcome {
                    Ok(mut rs) => {
                        rs.close_quietly();
                        Err(restore_err)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn dispatch_limited(
        &self,
        conn: &mut dyn Connection,
        sql: &str,
        query: bool,
        streaming: bool,
        concurrency: ResultSetConcurrency,
    ) -> Result<ResultSet> {
        let plan = limits::plan(conn.use_max_rows(), sql, query, self.max_rows);

        if let Some(directive) = plan.directive() {
            self.logger.log_directive(directive, self.id);
            self.metrics.record_limit_directive();
            let mut ack = conn.execute(
                directive,
                UNLIMITED_ROWS,
                ResultSetConcurrency::ReadOnly,
                false,
                false,
            )?;
            ack.close_quietly();
        }

        conn.execute(sql, plan.dispatch_max_rows(), concurrency, streaming, query)
    }

    /// Best-effort rollback after a statement-type mismatch. The mismatch
    /// error is what the caller sees, so failures here are only logged.
    fn rollback_quietly(&self) {
        let Ok(conn) = self.connection() else {
            return;
        };
        match lock_connection(&conn) {
            Ok(mut guard) => {
                if !guard.auto_commit() {
                    if let Err(e) = guard.rollback() {
                        log::warn!("Rollback after statement {} failed: {}", self.id, e);
                    }
                }
            }
            Err(e) => log::warn!("Rollback after statement {} skipped: {}", self.id, e),
        };
    }

    fn log_metadata(&self, kind: StatementKind) -> HashMap<String, String> {
        let mut metadata = HashMap::new();
        metadata.insert("statement_id".to_string(), self.id.to_string());
        metadata.insert("catalog".to_string(), self.catalog.clone());
        metadata.insert("kind".to_string(), kind.as_str().to_string());
        metadata
    }

    // ---- result slots -------------------------------------------------

    fn release_current(&mut self) {
        if let Some(mut rs) = self.current.take() {
            rs.close_quietly();
        }
    }

    /// Makes `rs` current and its follow-on response the lookahead.
    fn rotate_in(&mut self, mut rs: ResultSet) {
        let follow_on = rs.take_next();
        self.release_current();
        self.current = Some(rs);
        self.replace_pending(follow_on);
    }

    fn promote_pending(&mut self) {
        self.current = self.pending.take();
        let follow_on = self.current.as_mut().and_then(ResultSet::take_next);
        self.replace_pending(follow_on);
    }

    fn replace_pending(&mut self, next: Option<ResultSet>) {
        let next = next.map(|mut rs| {
            rs.bind(self.id, self.result_set_type, self.concurrency);
            rs
        });
        if let Some(mut stale) = std::mem::replace(&mut self.pending, next) {
            stale.close_quietly();
        }
    }

    pub fn get_more_results(&mut self) -> Result<bool> {
        self.get_more_results_with(MoreResults::CloseCurrent)
    }

    /// Rotates the lookahead into the current slot.
    pub fn get_more_results_with(&mut self, mode: MoreResults) -> Result<bool> {
        self.check_closed()?;

        if let Some(mut previous) = self.current.take() {
            if mode.closes_current() {
                previous.close_quietly();
            } else {
                self.retained.push(previous);
            }
        }
        if mode == MoreResults::CloseAll {
            for mut kept in self.retained.drain(..) {
                kept.close_quietly();
            }
        }

        self.promote_pending();
        Ok(self.current.as_ref().is_some_and(ResultSet::really_result))
    }

    /// The current result, only when it carries rows.
    pub fn result_set(&mut self) -> Result<Option<&mut ResultSet>> {
        self.check_closed()?;
        Ok(self.current.as_mut().filter(|rs| rs.really_result()))
    }

    pub fn has_pending_result(&self) -> bool {
        self.pending.is_some()
    }

    pub fn update_count(&self) -> Result<i32> {
        let count = self.long_update_count()?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    /// -1 when there is no current result or it carries rows.
    pub fn long_update_count(&self) -> Result<i64> {
        self.check_closed()?;
        Ok(match &self.current {
            Some(rs) if !rs.really_result() => rs.update_count(),
            _ => -1,
        })
    }

    pub fn last_insert_id(&self) -> Result<i64> {
        self.check_closed()?;
        Ok(self.last_insert_id)
    }

    pub fn generated_keys(&self) -> Result<ResultSet> {
        self.check_closed()?;
        let mut keys = ResultSet::generated_key_result(self.last_insert_id);
        keys.bind(self.id, ResultSetType::ForwardOnly, ResultSetConcurrency::ReadOnly);
        Ok(keys)
    }

    pub fn warnings(&self) -> Result<Option<&SqlWarning>> {
        self.check_closed()?;
        Ok(self.warnings.as_ref())
    }

    pub fn clear_warnings(&mut self) -> Result<()> {
        self.check_closed()?;
        self.warnings = None;
        Ok(())
    }

    /// Releases every held result and forgets the connection. Never fails
    /// and may be called any number of times.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.release_current();
        if let Some(mut rs) = self.pending.take() {
            rs.close_quietly();
        }
        for mut kept in self.retained.drain(..) {
            kept.close_quietly();
        }
        self.batch.clear();
        self.connection = None;
        self.warnings = None;
        self.closed = true;
        log::trace!("Statement {} closed", self.id);
    }

    // ---- settings ------------------------------------------------------

    pub fn max_field_size(&self) -> Result<i32> {
        self.check_closed()?;
        Ok(self.max_field_size)
    }

    pub fn set_max_field_size(&mut self, max: i32) -> Result<()> {
        self.check_closed()?;
        if max < 0 {
            return Err(StatementError::InvalidArgument(
                "Illegal value for setMaxFieldSize()".to_string(),
            ));
        }
        let conn = self.connection()?;
        let max_allowed = lock_connection(&conn)?.max_allowed_packet();
        if usize::try_from(max).unwrap_or(usize::MAX) > max_allowed {
            return Err(StatementError::LimitExceeded {
                requested: max,
                max_allowed,
            });
        }
        self.max_field_size = max;
        Ok(())
    }

    /// 0 when unlimited.
    pub fn max_rows(&self) -> Result<i32> {
        self.check_closed()?;
        Ok(self.max_rows.max(0))
    }

    pub fn set_max_rows(&mut self, max: i32) -> Result<()> {
        self.check_closed()?;
        if !(0..=MAX_ROWS).contains(&max) {
            return Err(StatementError::InvalidArgument(format!(
                "setMaxRows() out of range. {} > {}.",
                max, MAX_ROWS
            )));
        }
        let conn = self.connection()?;
        lock_connection(&conn)?.max_rows_changed();
        self.max_rows = if max == 0 { UNLIMITED_ROWS } else { max };
        Ok(())
    }

    pub fn fetch_size(&self) -> Result<i32> {
        self.check_closed()?;
        Ok(self.fetch_size)
    }

    pub fn set_fetch_size(&mut self, rows: i32) -> Result<()> {
        self.check_closed()?;
        let negative = rows < 0 && rows != STREAMING_FETCH_SIZE;
        let above_max = self.max_rows > 0 && rows > self.max_rows;
        if negative || above_max {
            return Err(StatementError::InvalidArgument(
                "Illegal value for setFetchSize()".to_string(),
            ));
        }
        self.fetch_size = rows;
        Ok(())
    }

    /// Stored only; enforcing it is up to the connection.
    pub fn query_timeout(&self) -> Result<i32> {
        self.check_closed()?;
        Ok(self.query_timeout_secs)
    }

    pub fn set_query_timeout(&mut self, seconds: i32) -> Result<()> {
        self.check_closed()?;
        if seconds < 0 {
            return Err(StatementError::InvalidArgument(
                "Illegal value for setQueryTimeout()".to_string(),
            ));
        }
        self.query_timeout_secs = seconds;
        Ok(())
    }

    pub fn fetch_direction(&self) -> Result<FetchDirection> {
        self.check_closed()?;
        Ok(FetchDirection::Forward)
    }

    /// Accepted for any direction; rows are always read forward.
    pub fn set_fetch_direction(&mut self, _direction: FetchDirection) -> Result<()> {
        self.check_closed()
    }

    pub fn escape_processing(&self) -> Result<bool> {
        self.check_closed()?;
        Ok(self.escape_processing)
    }

    pub fn set_escape_processing(&mut self, enable: bool) -> Result<()> {
        self.check_closed()?;
        self.escape_processing = enable;
        Ok(())
    }

    pub fn result_set_type(&self) -> Result<ResultSetType> {
        self.check_closed()?;
        Ok(self.result_set_type)
    }

    pub fn set_result_set_type(&mut self, result_set_type: ResultSetType) -> Result<()> {
        self.check_closed()?;
        self.result_set_type = result_set_type;
        Ok(())
    }

    pub fn result_set_concurrency(&self) -> Result<ResultSetConcurrency> {
        self.check_closed()?;
        Ok(self.concurrency)
    }

    pub fn set_result_set_concurrency(&mut self, concurrency: ResultSetConcurrency) -> Result<()> {
        self.check_closed()?;
        self.concurrency = concurrency;
        Ok(())
    }

    pub fn result_set_holdability(&self) -> Result<Holdability> {
        self.check_closed()?;
        Ok(Holdability::HoldCursorsOverCommit)
    }

    /// Forward-only, read-only, and fetch size set to the streaming marker.
    pub fn is_streaming(&self) -> bool {
        self.result_set_type == ResultSetType::ForwardOnly
            && self.concurrency == ResultSetConcurrency::ReadOnly
            && self.fetch_size == STREAMING_FETCH_SIZE
    }

    /// Cursors are unsupported; the name is ignored.
    pub fn set_cursor_name(&mut self, _name: &str) -> Result<()> {
        self.check_closed()
    }

    /// Execution is synchronous, so there is never anything to interrupt.
    pub fn cancel(&self) -> Result<()> {
        self.check_closed()
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        self.close();
    }
}
