//! Observability: structured engine events and the sink they flow into.
//!
//! The engine never formats log lines; every notable step is a
//! `DenormEvent` recorded through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventReport, RuleCounters};
pub use sink::{DenormEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
