pub mod logging;
pub mod metrics;

pub use logging::StructuredLogger;
pub use metrics::{get_global_metrics, Metrics, StatementKind, StatementMetrics};
