use super::{Connection, SharedConnection};
use crate::error::{Result, StatementError};
use crate::protocol::{RowBuffer, SqlType};
use crate::result::ResultSet;
use crate::statement::options::{ResultSetConcurrency, DEFAULT_MAX_PACKET, UNKNOWN_INSERT_ID};
use odbc_api::{ConnectionOptions, Cursor, CursorRow, Environment, ResultSetMetadata};
use std::sync::{Arc, Mutex, OnceLock};

static SESSION_ENV: OnceLock<std::result::Result<Environment, String>> = OnceLock::new();

fn session_env() -> Result<&'static Environment> {
    let env = SESSION_ENV.get_or_init(|| {
        Environment::new().map_err(|e| format!("Failed to create ODBC environment: {}", e))
    });

    match env {
        Ok(environment) => Ok(environment),
        Err(msg) => Err(StatementError::InternalError(msg.clone())),
    }
}

/// A [`Connection`] over one ODBC connection handle.
///
/// Rows are fully materialised; the streaming flag only changes logging.
/// Read-only is a local flag checked by statements, not a driver attribute.
pub struct OdbcSession {
    conn: Option<odbc_api::Connection<'static>>,
    catalog: String,
    read_only: bool,
    auto_commit: bool,
    use_max_rows: bool,
    max_allowed_packet: usize,
}

impl OdbcSession {
    pub fn connect(conn_str: &str) -> Result<Self> {
        if conn_str.is_empty() {
            return Err(StatementError::InvalidArgument(
                "Connection string cannot be empty".to_string(),
            ));
        }

        let env = session_env()?;
        let conn = env.connect_with_connection_string(conn_str, ConnectionOptions::default())?;
        let catalog = conn.current_catalog().unwrap_or_else(|e| {
            log::debug!("Driver does not report a current catalog: {}", e);
            String::new()
        });

        Ok(Self {
            conn: Some(conn),
            catalog,
            read_only: false,
            auto_commit: true,
            use_max_rows: false,
            max_allowed_packet: DEFAULT_MAX_PACKET,
        })
    }

    pub fn with_max_allowed_packet(mut self, bytes: usize) -> Self {
        self.max_allowed_packet = bytes;
        self
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn set_auto_commit(&mut self, enabled: bool) -> Result<()> {
        self.open()?.set_autocommit(enabled)?;
        self.auto_commit = enabled;
        Ok(())
    }

    pub fn close(&mut self) {
        self.conn = None;
    }

    pub fn into_shared(self) -> SharedConnection {
        Arc::new(Mutex::new(self))
    }

    fn open(&self) -> Result<&odbc_api::Connection<'static>> {
        self.conn.as_ref().ok_or(StatementError::ConnectionClosed)
    }
}

fn read_rows(cursor: &mut impl Cursor, max_rows: i32) -> Result<RowBuffer> {
    let cols_i16 = cursor.num_result_cols()?;
    let cols_u16: u16 = cols_i16
        .try_into()
        .map_err(|_| StatementError::InternalError("Invalid column count".to_string()))?;

    let mut row_buffer = RowBuffer::new();
    let mut column_types = Vec::with_capacity(cols_u16.into());
    for col_idx in 1..=cols_u16 {
        let col_name = cursor.col_name(col_idx)?;
        let sql_type = SqlType::from_data_type(&cursor.col_data_type(col_idx)?);
        row_buffer.add_column(col_name, sql_type);
        column_types.push(sql_type);
    }

    let cap = usize::try_from(max_rows).ok().filter(|&n| n > 0);
    while cap.map_or(true, |cap| row_buffer.row_count() < cap) {
        let Some(mut row) = cursor.next_row()? else {
            break;
        };
        let mut row_data = Vec::with_capacity(column_types.len());
        for (col_number, &sql_type) in (1u16..).zip(column_types.iter()) {
            row_data.push(read_cell(&mut row, col_number, sql_type)?);
        }
        row_buffer.add_row(row_data);
    }

    Ok(row_buffer)
}

fn read_cell(row: &mut CursorRow<'_>, col_number: u16, sql_type: SqlType) -> Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let has_value = match sql_type {
        SqlType::Binary => row.get_binary(col_number, &mut buf)?,
        _ => row.get_text(col_number, &mut buf)?,
    };
    Ok(has_value.then_some(buf))
}

impl Connection for OdbcSession {
    fn execute(
        &mut self,
        sql: &str,
        max_rows: i32,
        _concurrency: ResultSetConcurrency,
        streaming: bool,
        _is_query: bool,
    ) -> Result<ResultSet> {
        if streaming {
            log::trace!("Streaming requested; buffering rows for: {}", sql);
        }

        let conn = self.open()?;
        let mut prepared = conn.prepare(sql)?;
        let rows = match prepared.execute(())? {
            Some(mut cursor) => Some(read_rows(&mut cursor, max_rows)?),
            None => None,
        };

        match rows {
            Some(rows) => Ok(ResultSet::with_rows(rows)),
            None => {
                let count = prepared.row_count()?.unwrap_or(0);
                let count = i64::try_from(count).unwrap_or(i64::MAX);
                Ok(ResultSet::update(count, UNKNOWN_INSERT_ID))
            }
        }
    }

    fn catalog(&self) -> Result<String> {
        self.open()?;
        Ok(self.catalog.clone())
    }

    fn set_catalog(&mut self, catalog: &str) -> Result<()> {
        let conn = self.open()?;
        conn.execute(&format!("USE {}", catalog), (), None)?;
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
        self.open()?.rollback()?;
        Ok(())
    }

    fn use_max_rows(&self) -> bool {
        self.use_max_rows
    }

    fn max_rows_changed(&mut self) {
        self.use_max_rows = true;
    }

    fn max_allowed_packet(&self) -> usize {
        self.max_allowed_packet
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }
}
