//! Metrics and observability module
//!
//! Provides Prometheus-compatible metrics for fault injection runs.
//!
//! Key metrics exposed:
//! - Dropped messages by direction and reason
//! - Loopback deliveries and failures
//! - Ignore-list size

pub mod exporter;
pub mod recorder;

pub use exporter::{render_metrics, start_metrics_server, MetricsConfig, MetricsError};
pub use recorder::{
    init_metrics, record_loopback, record_loopback_failure, record_message_dropped,
    set_ignored_members,
};
