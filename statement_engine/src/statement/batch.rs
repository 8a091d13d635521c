use super::options::EXECUTE_FAILED;
use super::Statement;
use crate::connection::lock_connection;
use crate::error::{Result, StatementError};

impl Statement {
    /// Queues `sql` for `execute_batch`. Empty text is ignored.
    pub fn add_batch(&mut self, sql: &str) -> Result<()> {
        self.check_closed()?;
        if !sql.is_empty() {
            self.batch.push(sql.to_string());
        }
        Ok(())
    }

    pub fn clear_batch(&mut self) -> Result<()> {
        self.check_closed()?;
        self.batch.clear();
        Ok(())
    }

    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// Runs every queued command as an update, in order, and keeps going
    /// after failures. Failed entries report `EXECUTE_FAILED`; if any
    /// failed, the last error is returned as `BatchFailure` carrying all
    /// outcomes. The queue is empty afterwards whatever happens.
    pub fn execute_batch(&mut self) -> Result<Vec<i32>> {
        let commands = std::mem::take(&mut self.batch);
        self.check_closed()?;

        let conn = self.connection()?;
        let read_only = lock_connection(&conn)?.is_read_only();
        if read_only {
            return Err(StatementError::ReadOnlyViolation);
        }

        let mut update_counts = Vec::with_capacity(commands.len());
        let mut last_error = None;
        let mut failed = 0usize;

        for sql in &commands {
            match self.execute_update(sql) {
                Ok(count) => update_counts.push(count),
                Err(e) => {
                    log::debug!("Batch entry failed on statement {}: {}", self.id, e);
                    update_counts.push(EXECUTE_FAILED);
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        self.logger.log_batch(self.id, &update_counts, failed);

        match last_error {
            None => Ok(update_counts),
            Some(e) => {
                self.metrics.record_batch_failure();
                Err(StatementError::BatchFailure {
                    message: e.message(),
                    sqlstate: e.sqlstate(),
                    native_code: e.native_code(),
                    update_counts,
                })
            }
        }
    }
}
