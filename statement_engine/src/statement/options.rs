use crate::error::StatementError;
use serde::{Deserialize, Serialize};

/// Largest value accepted by `set_max_rows`.
pub const MAX_ROWS: i32 = 50_000_000;

/// Internal marker for "no row limit"; reported as 0 by `max_rows()`.
pub const UNLIMITED_ROWS: i32 = -1;

/// Fetch size that requests a row-by-row streaming result.
pub const STREAMING_FETCH_SIZE: i32 = i32::MIN;

/// Batch outcome recorded for an entry that failed.
pub const EXECUTE_FAILED: i32 = -3;

/// Generated key reported before any statement produced one.
pub const UNKNOWN_INSERT_ID: i64 = -1;

/// Max field size used when no connection reports its packet budget.
pub const DEFAULT_MAX_PACKET: usize = 65535;

macro_rules! coded_enum {
    ($name:ident, $what:literal, { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl $name {
            pub fn code(self) -> i32 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = StatementError;

            fn try_from(code: i32) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(StatementError::InvalidArgument(format!(
                        "Illegal value for {}: {}",
                        $what, code
                    ))),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

coded_enum!(ResultSetType, "result set type", {
    ForwardOnly = 1003,
    ScrollInsensitive = 1004,
    ScrollSensitive = 1005,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

coded_enum!(ResultSetConcurrency, "result set concurrency", {
    ReadOnly = 1007,
    Updatable = 1008,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

coded_enum!(FetchDirection, "setFetchDirection()", {
    Forward = 1000,
    Reverse = 1001,
    Unknown = 1002,
});

/// What `get_more_results_with` does with the result it rotates out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoreResults {
    CloseCurrent,
    KeepCurrent,
    CloseAll,
}

coded_enum!(MoreResults, "getMoreResults(int)", {
    CloseCurrent = 1,
    KeepCurrent = 2,
    CloseAll = 3,
});

impl MoreResults {
    pub fn closes_current(self) -> bool {
        matches!(self, Self::CloseCurrent | Self::CloseAll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holdability {
    HoldCursorsOverCommit,
    CloseCursorsAtCommit,
}

coded_enum!(Holdability, "result set holdability", {
    HoldCursorsOverCommit = 1,
    CloseCursorsAtCommit = 2,
});

/// Which generated keys a caller asked for. The driver always reports
/// the single auto-increment key, whatever is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKeys<'a> {
    Flag(i32),
    ColumnIndexes(&'a [i32]),
    ColumnNames(&'a [&'a str]),
}
