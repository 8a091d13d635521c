use crate::error::{Result, StatementError};
use crate::statement::options::{ResultSetConcurrency, ResultSetType};
use serde::{Deserialize, Serialize};

pub const ENV_MAX_ROWS: &str = "STATEMENT_MAX_ROWS";
pub const ENV_FETCH_SIZE: &str = "STATEMENT_FETCH_SIZE";
pub const ENV_QUERY_TIMEOUT: &str = "STATEMENT_QUERY_TIMEOUT";
pub const ENV_ESCAPE_PROCESSING: &str = "STATEMENT_ESCAPE_PROCESSING";

/// Initial settings for a statement. Values are validated when applied,
/// by the same setters callers use afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    /// `None` keeps the connection's max allowed packet.
    pub max_field_size: Option<i32>,
    /// 0 means unlimited.
    pub max_rows: i32,
    pub fetch_size: i32,
    pub query_timeout_secs: i32,
    pub escape_processing: bool,
    pub result_set_type: ResultSetType,
    pub result_set_concurrency: ResultSetConcurrency,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            max_field_size: None,
            max_rows: 0,
            fetch_size: 0,
            query_timeout_secs: 0,
            escape_processing: true,
            result_set_type: ResultSetType::ForwardOnly,
            result_set_concurrency: ResultSetConcurrency::ReadOnly,
        }
    }
}

impl StatementConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            StatementError::InvalidArgument(format!("Invalid statement config: {}", e))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| StatementError::InternalError(format!("Config serialization: {}", e)))
    }

    /// Property string over process environment over defaults.
    pub fn resolve(properties: &str) -> Result<Self> {
        Self::resolve_with(properties, |key| std::env::var(key).ok())
    }

    pub fn resolve_with<F>(properties: &str, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(env)?;
        config.apply_properties(properties)?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = env(ENV_MAX_ROWS) {
            self.max_rows = parse_int(ENV_MAX_ROWS, &v)?;
        }
        if let Some(v) = env(ENV_FETCH_SIZE) {
            self.fetch_size = parse_int(ENV_FETCH_SIZE, &v)?;
        }
        if let Some(v) = env(ENV_QUERY_TIMEOUT) {
            self.query_timeout_secs = parse_int(ENV_QUERY_TIMEOUT, &v)?;
        }
        if let Some(v) = env(ENV_ESCAPE_PROCESSING) {
            self.escape_processing = parse_bool(ENV_ESCAPE_PROCESSING, &v)?;
        }
        Ok(())
    }

    /// Applies `key=value;key=value` pairs. Keys ignore case and `_`.
    pub fn apply_properties(&mut self, properties: &str) -> Result<()> {
        for part in split_property_parts(properties) {
            let Some((key, raw_value)) = part.split_once('=') else {
                continue;
            };
            let key = normalize_key(key);
            let value = raw_value.trim().trim_matches(|c| c == '{' || c == '}');

            match key.as_str() {
                "maxrows" => self.max_rows = parse_int(&key, value)?,
                "fetchsize" => self.fetch_size = parse_int(&key, value)?,
                "maxfieldsize" => self.max_field_size = Some(parse_int(&key, value)?),
                "querytimeout" | "querytimeoutsecs" => {
                    self.query_timeout_secs = parse_int(&key, value)?
                }
                "escapeprocessing" => self.escape_processing = parse_bool(&key, value)?,
                "resultsettype" => self.result_set_type = parse_result_set_type(value)?,
                "resultsetconcurrency" => {
                    self.result_set_concurrency = parse_concurrency(value)?
                }
                other => log::debug!("Ignoring unknown statement property '{}'", other),
            }
        }
        Ok(())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    parse_bool_flag(value).ok_or_else(|| {
        StatementError::InvalidArgument(format!("Invalid boolean for {}: '{}'", key, value))
    })
}

fn parse_int(key: &str, value: &str) -> Result<i32> {
    value.trim().parse::<i32>().map_err(|_| {
        StatementError::InvalidArgument(format!("Invalid integer for {}: '{}'", key, value))
    })
}

fn parse_result_set_type(value: &str) -> Result<ResultSetType> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "forward_only" => Ok(ResultSetType::ForwardOnly),
        "scroll_insensitive" => Ok(ResultSetType::ScrollInsensitive),
        "scroll_sensitive" => Ok(ResultSetType::ScrollSensitive),
        other => ResultSetType::try_from(parse_int("resultsettype", other)?),
    }
}

fn parse_concurrency(value: &str) -> Result<ResultSetConcurrency> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "read_only" => Ok(ResultSetConcurrency::ReadOnly),
        "updatable" => Ok(ResultSetConcurrency::Updatable),
        other => ResultSetConcurrency::try_from(parse_int("resultsetconcurrency", other)?),
    }
}

/// Splits on `;` outside `{...}` so braced values may contain semicolons.
fn split_property_parts(properties: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut brace_depth = 0u32;

    for (idx, ch) in properties.char_indices() {
        match ch {
            '{' => brace_depth = brace_depth.saturating_add(1),
            '}' => brace_depth = brace_depth.saturating_sub(1),
            ';' if brace_depth == 0 => {
                parts.push(&properties[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&properties[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
