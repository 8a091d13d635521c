use thiserror::Error;

/// Error category for decision-making (retry, abort, reconnect, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Transient error - retry may resolve
    Transient,
    /// Fatal error - should abort operation
    Fatal,
    /// Validation error - invalid caller input or wrong call for the statement
    Validation,
    /// Connection lost - should reconnect
    ConnectionLost,
}

pub(crate) const SQLSTATE_ILLEGAL_ARGUMENT: [u8; 5] = *b"S1009";
pub(crate) const SQLSTATE_GENERAL_ERROR: [u8; 5] = *b"S1000";
pub(crate) const SQLSTATE_CONNECTION_CLOSED: [u8; 5] = *b"08003";
pub(crate) const SQLSTATE_UPDATE_RETURNED_ROWS: [u8; 5] = *b"01S03";

#[derive(Error, Debug, Clone)]
pub enum StatementError {
    #[cfg(feature = "odbc")]
    #[error("ODBC error: {0}")]
    OdbcApi(String),

    #[error("Structured error: {message}")]
    Structured {
        sqlstate: [u8; 5],
        native_code: i32,
        message: String,
    },

    #[error("Connection is closed.")]
    ConnectionClosed,

    #[error("{0}")]
    IllegalState(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Connection is read-only. Queries leading to data modification are not allowed")]
    ReadOnlyViolation,

    #[error("Can not set max field size > max allowed packet: {max_allowed}")]
    LimitExceeded { requested: i32, max_allowed: usize },

    #[error("Can not issue INSERT/UPDATE/DELETE with executeQuery()")]
    NotAQuery,

    #[error("Results returned for UPDATE ONLY.")]
    ExpectedUpdateGotRows,

    #[error("Batch failed: {message}")]
    BatchFailure {
        message: String,
        sqlstate: [u8; 5],
        native_code: i32,
        update_counts: Vec<i32>,
    },

    #[error("Internal error: {0}")]
    InternalError(String),
}

#[cfg(feature = "odbc")]
impl From<odbc_api::Error> for StatementError {
    fn from(err: odbc_api::Error) -> Self {
        if let Some(structured) = try_extract_structured(&err) {
            return structured;
        }
        StatementError::OdbcApi(err.to_string())
    }
}

#[cfg(feature = "odbc")]
fn try_extract_structured(err: &odbc_api::Error) -> Option<StatementError> {
    use odbc_api::Error as OdbcErr;
    let record = match err {
        OdbcErr::Diagnostics { record, .. } => record,
        OdbcErr::UnsupportedOdbcApiVersion(record) => record,
        OdbcErr::InvalidRowArraySize { record, .. } => record,
        OdbcErr::UnableToRepresentNull(record) => record,
        OdbcErr::OracleOdbcDriverDoesNotSupport64Bit(record) => record,
        _ => return None,
    };
    Some(StatementError::Structured {
        sqlstate: record.state.0,
        native_code: record.native_error,
        message: record.to_string(),
    })
}

impl StatementError {
    pub fn closed_statement() -> Self {
        StatementError::IllegalState("No operations allowed after statement closed".to_string())
    }

    pub fn sqlstate(&self) -> [u8; 5] {
        match self {
            StatementError::Structured { sqlstate, .. }
            | StatementError::BatchFailure { sqlstate, .. } => *sqlstate,
            StatementError::ConnectionClosed => SQLSTATE_CONNECTION_CLOSED,
            StatementError::IllegalState(_) => SQLSTATE_GENERAL_ERROR,
            StatementError::InvalidArgument(_)
            | StatementError::ReadOnlyViolation
            | StatementError::LimitExceeded { .. }
            | StatementError::NotAQuery => SQLSTATE_ILLEGAL_ARGUMENT,
            StatementError::ExpectedUpdateGotRows => SQLSTATE_UPDATE_RETURNED_ROWS,
            _ => [0u8; 5],
        }
    }

    pub fn native_code(&self) -> i32 {
        match self {
            StatementError::Structured { native_code, .. }
            | StatementError::BatchFailure { native_code, .. } => *native_code,
            _ => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            StatementError::Structured { message, .. }
            | StatementError::BatchFailure { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }

    pub fn to_structured(&self) -> StructuredError {
        StructuredError {
            sqlstate: self.sqlstate(),
            native_code: self.native_code(),
            message: self.message(),
        }
    }

    /// Per-entry outcomes of a failed batch, `None` for every other error.
    pub fn update_counts(&self) -> Option<&[i32]> {
        match self {
            StatementError::BatchFailure { update_counts, .. } => Some(update_counts),
            _ => None,
        }
    }

    /// Returns true if the error is transient and may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            StatementError::Structured { sqlstate, .. } => {
                // Connection errors (08xxx) and lock wait / deadlock (40001) are retryable
                (sqlstate[0] == b'0' && sqlstate[1] == b'8') || sqlstate == b"40001"
            }
            StatementError::InternalError(msg) => msg.contains("timeout") || msg.contains("Timeout"),
            _ => false,
        }
    }

    /// Returns true if this is a connection-related error
    pub fn is_connection_error(&self) -> bool {
        match self {
            StatementError::ConnectionClosed => true,
            StatementError::Structured { sqlstate, .. } => sqlstate[0] == b'0' && sqlstate[1] == b'8',
            _ => false,
        }
    }

    /// Returns the error category for decision-making
    pub fn error_category(&self) -> ErrorCategory {
        if matches!(
            self,
            StatementError::InvalidArgument(_)
                | StatementError::ReadOnlyViolation
                | StatementError::LimitExceeded { .. }
                | StatementError::NotAQuery
                | StatementError::ExpectedUpdateGotRows
        ) {
            return ErrorCategory::Validation;
        }
        if self.is_connection_error() {
            return ErrorCategory::ConnectionLost;
        }
        if self.is_retryable() {
            return ErrorCategory::Transient;
        }
        ErrorCategory::Fatal
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredError {
    pub sqlstate: [u8; 5],
    pub native_code: i32,
    pub message: String,
}

impl StructuredError {
    pub fn sqlstate_str(&self) -> String {
        String::from_utf8_lossy(&self.sqlstate).into_owned()
    }
}

pub type Result<T> = std::result::Result<T, StatementError>;
