use crate::error::{Result, StatementError};
use crate::protocol::{RowBuffer, SqlType, SqlWarning};
use crate::statement::options::{ResultSetConcurrency, ResultSetType, UNKNOWN_INSERT_ID};
use std::fmt;

/// Releases connection-side resources (e.g. an unread streaming cursor).
pub type ReleaseHook = Box<dyn FnOnce() -> Result<()> + Send>;

/// One server response: either rows or an update count plus generated key.
pub struct ResultSet {
    rows: Option<RowBuffer>,
    update_count: i64,
    generated_key: i64,
    warnings: Option<SqlWarning>,
    next: Option<Box<ResultSet>>,
    statement_id: Option<u64>,
    result_set_type: ResultSetType,
    concurrency: ResultSetConcurrency,
    cursor: Option<usize>,
    closed: bool,
    release: Option<ReleaseHook>,
}

impl ResultSet {
    pub fn with_rows(rows: RowBuffer) -> Self {
        Self::build(Some(rows), -1, UNKNOWN_INSERT_ID)
    }

    pub fn update(update_count: i64, generated_key: i64) -> Self {
        Self::build(None, update_count, generated_key)
    }

    fn build(rows: Option<RowBuffer>, update_count: i64, generated_key: i64) -> Self {
        Self {
            rows,
            update_count,
            generated_key,
            warnings: None,
            next: None,
            statement_id: None,
            result_set_type: ResultSetType::default(),
            concurrency: ResultSetConcurrency::default(),
            cursor: None,
            closed: false,
            release: None,
        }
    }

    /// Single-row, single-column pseudo result holding a generated key.
    pub fn generated_key_result(key: i64) -> Self {
        let mut rows = RowBuffer::new();
        rows.add_column("GENERATED_KEY".to_string(), SqlType::Integer);
        rows.add_row(vec![Some(key.to_string().into_bytes())]);
        Self::with_rows(rows)
    }

    pub fn with_warning(mut self, warning: SqlWarning) -> Self {
        match self.warnings {
            Some(ref mut head) => head.chain(warning),
            None => self.warnings = Some(warning),
        }
        self
    }

    /// Attaches the response that followed this one on the wire.
    pub fn with_next(mut self, next: ResultSet) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    pub fn with_release_hook(mut self, hook: ReleaseHook) -> Self {
        self.release = Some(hook);
        self
    }

    /// True when the response carries a row set, even an empty one.
    pub fn really_result(&self) -> bool {
        self.rows.is_some()
    }

    pub fn update_count(&self) -> i64 {
        self.update_count
    }

    pub fn generated_key(&self) -> i64 {
        self.generated_key
    }

    pub fn warnings(&self) -> Option<&SqlWarning> {
        self.warnings.as_ref()
    }

    pub fn take_warnings(&mut self) -> Option<SqlWarning> {
        self.warnings.take()
    }

    pub fn take_next(&mut self) -> Option<ResultSet> {
        self.next.take().map(|next| *next)
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    pub fn bind(
        &mut self,
        statement_id: u64,
        result_set_type: ResultSetType,
        concurrency: ResultSetConcurrency,
    ) {
        self.statement_id = Some(statement_id);
        self.result_set_type = result_set_type;
        self.concurrency = concurrency;
    }

    pub fn statement_id(&self) -> Option<u64> {
        self.statement_id
    }

    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    pub fn concurrency(&self) -> ResultSetConcurrency {
        self.concurrency
    }

    pub fn rows(&self) -> Option<&RowBuffer> {
        self.rows.as_ref()
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, RowBuffer::row_count)
    }

    pub fn find_column(&self, name: &str) -> Result<usize> {
        self.rows
            .as_ref()
            .and_then(|rows| rows.column_index(name))
            .map(|idx| idx + 1)
            .ok_or_else(|| StatementError::InvalidArgument(format!("Column '{}' not found.", name)))
    }

    /// Advances the row cursor; false once past the last row.
    pub fn next(&mut self) -> Result<bool> {
        self.check_open()?;
        let total = self.row_count();
        let position = self.cursor.map_or(0, |p| p + 1);
        self.cursor = Some(position.min(total));
        Ok(position < total)
    }

    /// Raw cell of the current row; `column` is 1-based.
    pub fn get_bytes(&self, column: usize) -> Result<Option<&[u8]>> {
        self.check_open()?;
        let rows = self
            .rows
            .as_ref()
            .ok_or_else(|| StatementError::IllegalState("Result carries no rows".to_string()))?;
        let row = self
            .cursor
            .and_then(|p| rows.rows.get(p))
            .ok_or_else(|| StatementError::IllegalState("Before start of result set".to_string()))?;
        if column == 0 || column > row.len() {
            return Err(StatementError::InvalidArgument(format!(
                "Column Index out of range ( {} > {}).",
                column,
                row.len()
            )));
        }
        Ok(row[column - 1].as_deref())
    }

    pub fn get_string(&self, column: usize) -> Result<Option<String>> {
        Ok(self
            .get_bytes(column)?
            .map(|b| String::from_utf8_lossy(b).into_owned()))
    }

    pub fn get_i64(&self, column: usize) -> Result<Option<i64>> {
        let Some(text) = self.get_string(column)? else {
            return Ok(None);
        };
        text.trim().parse::<i64>().map(Some).map_err(|_| {
            StatementError::InvalidArgument(format!("Value '{}' is not an integer", text))
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drops the rows and runs the release hook once; later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.rows = None;
        self.cursor = None;
        if let Some(mut next) = self.next.take() {
            next.close_quietly();
        }
        match self.release.take() {
            Some(hook) => hook(),
            None => Ok(()),
        }
    }

    /// `close()` whose failure is logged and discarded.
    pub(crate) fn close_quietly(&mut self) {
        if let Err(e) = self.close() {
            log::debug!("Ignoring failure while releasing result: {}", e);
        }
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(StatementError::IllegalState(
                "Operation not allowed after ResultSet closed".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultSet")
            .field("really_result", &self.really_result())
            .field("rows", &self.row_count())
            .field("update_count", &self.update_count)
            .field("generated_key", &self.generated_key)
            .field("has_next", &self.has_next())
            .field("statement_id", &self.statement_id)
            .field("closed", &self.closed)
            .finish()
    }
}
