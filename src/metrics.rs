use prometheus::{Counter, Gauge, Opts, Registry, TextEncoder};
use tracing::error;

lazy_static::lazy_static! {
    // Buffer metrics
    pub static ref MESSAGES_BUFFERED: Counter = Counter::with_opts(
        Opts::new("sentinel_messages_buffered_total", "Total number of messages buffered from Discord")
    ).unwrap();

    pub static ref MESSAGES_EVICTED: Counter = Counter::with_opts(
        Opts::new("sentinel_messages_evicted_total", "Total number of messages evicted after aging out of the context window")
    ).unwrap();

    pub static ref BUFFERED_MESSAGES: Gauge = Gauge::with_opts(
        Opts::new("sentinel_buffered_messages", "Number of messages currently buffered across all channels")
    ).unwrap();

    // Dispatch metrics
    pub static ref MESSAGES_CHECKED: Counter = Counter::with_opts(
        Opts::new("sentinel_messages_checked_total", "Total number of messages acknowledged by the moderation service")
    ).unwrap();

    pub static ref VIOLATIONS_REPORTED: Counter = Counter::with_opts(
        Opts::new("sentinel_violations_reported_total", "Total number of violations reported by the moderation service")
    ).unwrap();

    pub static ref DISPATCH_FAILURES: Counter = Counter::with_opts(
        Opts::new("sentinel_dispatch_failures_total", "Total number of failed batch dispatches")
    ).unwrap();
}

pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let registry = Registry::new();

        registry.register(Box::new(MESSAGES_BUFFERED.clone())).unwrap();
        registry.register(Box::new(MESSAGES_EVICTED.clone())).unwrap();
        registry.register(Box::new(BUFFERED_MESSAGES.clone())).unwrap();
        registry.register(Box::new(MESSAGES_CHECKED.clone())).unwrap();
        registry.register(Box::new(VIOLATIONS_REPORTED.clone())).unwrap();
        registry.register(Box::new(DISPATCH_FAILURES.clone())).unwrap();

        Self { registry }
    }

    pub fn gather_metrics(&self) -> String {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&metric_families).unwrap_or_else(|e| {
            error!("Failed to encode metrics: {}", e);
            String::new()
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
