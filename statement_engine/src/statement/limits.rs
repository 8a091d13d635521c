//! Row-limit governance: decide between an explicit per-call cap and a
//! session-level `SQL_SELECT_LIMIT` directive.
//!
//! Statement classification is a prefix heuristic, not a parser: a
//! statement is a query when its first non-whitespace character is `S`.

use super::options::UNLIMITED_ROWS;

pub const SELECT_LIMIT_DEFAULT: &str = "SET OPTION SQL_SELECT_LIMIT=DEFAULT";

/// How one dispatch is bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitPlan {
    /// Session limits are not in use; dispatch as is.
    Direct,
    /// The text carries its own LIMIT; pass the cap alongside it.
    Inline { max_rows: i32 },
    /// Issue `directive` first, then dispatch uncapped.
    Session { directive: String },
}

impl LimitPlan {
    pub fn directive(&self) -> Option<&str> {
        match self {
            LimitPlan::Session { directive } => Some(directive),
            _ => None,
        }
    }

    /// Per-call cap handed to the connection.
    pub fn dispatch_max_rows(&self) -> i32 {
        match self {
            LimitPlan::Inline { max_rows } => *max_rows,
            _ => UNLIMITED_ROWS,
        }
    }
}

pub fn first_non_whitespace(sql: &str) -> Option<char> {
    sql.chars().find(|c| !c.is_whitespace())
}

pub fn is_query(sql: &str) -> bool {
    matches!(first_non_whitespace(sql), Some('S') | Some('s'))
}

pub fn has_limit_clause(sql: &str) -> bool {
    sql.to_ascii_uppercase().contains("LIMIT")
}

pub fn select_limit_directive(max_rows: i32) -> String {
    if max_rows <= 0 {
        SELECT_LIMIT_DEFAULT.to_string()
    } else {
        format!("SET OPTION SQL_SELECT_LIMIT={}", max_rows)
    }
}

pub fn plan(use_max_rows: bool, sql: &str, query: bool, max_rows: i32) -> LimitPlan {
    if !use_max_rows {
        return LimitPlan::Direct;
    }
    if !query {
        return LimitPlan::Session {
            directive: SELECT_LIMIT_DEFAULT.to_string(),
        };
    }
    if has_limit_clause(sql) {
        LimitPlan::Inline { max_rows }
    } else {
        LimitPlan::Session {
            directive: select_limit_directive(max_rows),
        }
    }
}
