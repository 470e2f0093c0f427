//! Observability infrastructure - tracing export and Prometheus metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_http_request, record_key_verification,
    record_usage_ingested, PrometheusMetrics,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
