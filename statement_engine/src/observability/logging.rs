use log::Level;
use std::collections::HashMap;

pub struct StructuredLogger {
    enabled: bool,
}

fn with_metadata(mut message: String, metadata: &HashMap<String, String>) -> String {
    let mut keys: Vec<&String> = metadata.keys().collect();
    keys.sort();
    for key in keys {
        message.push_str(&format!(", {}={}", key, metadata[key]));
    }
    message
}

impl StructuredLogger {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn log_statement(&self, level: Level, sql: &str, metadata: &HashMap<String, String>) {
        if !self.enabled {
            return;
        }

        let message = with_metadata(format!("Statement: {}", sql), metadata);
        log::log!(level, "{}", message);
    }

    pub fn log_directive(&self, directive: &str, statement_id: u64) {
        if !self.enabled {
            return;
        }

        log::debug!("Row limit directive: {}, statement_id={}", directive, statement_id);
    }

    pub fn log_error(&self, error: &str, metadata: &HashMap<String, String>) {
        if !self.enabled {
            return;
        }

        let message = with_metadata(format!("Error: {}", error), metadata);
        log::error!("{}", message);
    }

    pub fn log_batch(&self, statement_id: u64, update_counts: &[i32], failed: usize) {
        if !self.enabled {
            return;
        }

        if failed > 0 {
            log::warn!(
                "Batch finished with {} of {} commands failed, statement_id={}",
                failed,
                update_counts.len(),
                statement_id
            );
        } else {
            log::info!(
                "Batch finished: {} commands, statement_id={}",
                update_counts.len(),
                statement_id
            );
        }
    }
}

impl Default for StructuredLogger {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_logger_new() {
        let logger = StructuredLogger::new(true);
        assert!(logger.is_enabled());
    }

    #[test]
    fn test_structured_logger_default() {
        let logger = StructuredLogger::default();
        assert!(logger.is_enabled());
    }

    #[test]
    fn test_structured_logger_disabled() {
        let logger = StructuredLogger::new(false);
        assert!(!logger.is_enabled());
    }

    #[test]
    fn test_with_metadata_is_sorted() {
        let mut metadata = HashMap::new();
        metadata.insert("statement_id".to_string(), "3".to_string());
        metadata.insert("catalog".to_string(), "shop".to_string());

        let message = with_metadata("Statement: SELECT 1".to_string(), &metadata);
        assert_eq!(message, "Statement: SELECT 1, catalog=shop, statement_id=3");
    }

    #[test]
    fn test_log_statement_levels() {
        let logger = StructuredLogger::new(true);
        let metadata = HashMap::new();
        logger.log_statement(Level::Info, "SELECT 1", &metadata);
        logger.log_statement(Level::Debug, "SELECT 1", &metadata);
        logger.log_statement(Level::Trace, "SELECT 1", &metadata);
    }

    #[test]
    fn test_log_disabled_is_silent() {
        let logger = StructuredLogger::new(false);
        let metadata = HashMap::new();
        logger.log_statement(Level::Info, "SELECT 1", &metadata);
        logger.log_directive("SET OPTION SQL_SELECT_LIMIT=DEFAULT", 1);
        logger.log_error("boom", &metadata);
        logger.log_batch(1, &[1, -3], 1);
    }
}
