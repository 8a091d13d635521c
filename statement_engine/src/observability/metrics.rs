use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

lazy_static::lazy_static! {
    static ref GLOBAL_METRICS: Arc<Metrics> = Arc::new(Metrics::new());
}

/// Process-wide metrics that statements record into unless given their own.
pub fn get_global_metrics() -> Arc<Metrics> {
    Arc::clone(&GLOBAL_METRICS)
}

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Which entry point dispatched a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Execute,
    Query,
    Update,
}

impl StatementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Query => "query",
            Self::Update => "update",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatementMetrics {
    pub statement_count: u64,
    pub total_latency: Duration,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub latency_samples: Vec<Duration>,
}

impl Default for StatementMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementMetrics {
    pub fn new() -> Self {
        Self {
            statement_count: 0,
            total_latency: Duration::ZERO,
            min_latency: Duration::MAX,
            max_latency: Duration::ZERO,
            latency_samples: Vec::new(),
        }
    }

    pub fn record(&mut self, latency: Duration) {
        self.statement_count += 1;
        self.total_latency += latency;

        if latency < self.min_latency {
            self.min_latency = latency;
        }
        if latency > self.max_latency {
            self.max_latency = latency;
        }

        self.latency_samples.push(latency);
        if self.latency_samples.len() > MAX_LATENCY_SAMPLES {
            self.latency_samples.remove(0);
        }
    }

    pub fn average_latency(&self) -> Duration {
        if self.statement_count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_latency.as_nanos() / u128::from(self.statement_count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn percentile(&self, p: f64) -> Duration {
        if self.latency_samples.is_empty() {
            return Duration::ZERO;
        }

        let mut sorted = self.latency_samples.clone();
        sorted.sort();

        let index = ((sorted.len() - 1) as f64 * p / 100.0) as usize;
        sorted[index]
    }

    pub fn p50(&self) -> Duration {
        self.percentile(50.0)
    }

    pub fn p95(&self) -> Duration {
        self.percentile(95.0)
    }

    pub fn p99(&self) -> Duration {
        self.percentile(99.0)
    }
}

#[derive(Debug, Default)]
struct Counters {
    by_kind: HashMap<StatementKind, u64>,
    errors: u64,
    limit_directives: u64,
    batch_failures: u64,
}

pub struct Metrics {
    statement_metrics: Mutex<StatementMetrics>,
    counters: Mutex<Counters>,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            statement_metrics: Mutex::new(StatementMetrics::new()),
            counters: Mutex::new(Counters::default()),
            start_time: Instant::now(),
        }
    }

    pub fn record_statement(&self, kind: StatementKind, latency: Duration) {
        if let Ok(mut metrics) = self.statement_metrics.lock() {
            metrics.record(latency);
        }
        if let Ok(mut counters) = self.counters.lock() {
            *counters.by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.errors += 1;
        }
    }

    /// One extra round trip spent on `SET OPTION SQL_SELECT_LIMIT`.
    pub fn record_limit_directive(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.limit_directives += 1;
        }
    }

    pub fn record_batch_failure(&self) {
        if let Ok(mut counters) = self.counters.lock() {
            counters.batch_failures += 1;
        }
    }

    pub fn get_statement_metrics(&self) -> StatementMetrics {
        self.statement_metrics
            .lock()
            .map(|m| m.clone())
            .unwrap_or_else(|_| StatementMetrics::new())
    }

    pub fn get_statement_count(&self, kind: StatementKind) -> u64 {
        self.counters
            .lock()
            .map(|c| c.by_kind.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn get_error_count(&self) -> u64 {
        self.counters.lock().map(|c| c.errors).unwrap_or(0)
    }

    pub fn get_limit_directive_count(&self) -> u64 {
        self.counters.lock().map(|c| c.limit_directives).unwrap_or(0)
    }

    pub fn get_batch_failure_count(&self) -> u64 {
        self.counters.lock().map(|c| c.batch_failures).unwrap_or(0)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
