use crate::{CallOutcome, GuardMetrics};
use std::time::Duration;
use tracing::{debug, trace};

/// Metrics adapter that logs guard events via `tracing`
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    /// Service name/prefix (optional)
    service_name: Option<String>,
}

impl TracingMetrics {
    /// Create new tracing metrics adapter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with service name prefix
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

impl GuardMetrics for TracingMetrics {
    fn record_outcome(&self, key: &str, outcome: CallOutcome) {
        debug!(
            target: "ucroe",
            event = outcome.as_str(),
            function = %key,
            service = ?self.service_name,
            "Guarded call finished"
        );
    }

    fn record_latency(&self, key: &str, duration: Duration) {
        trace!(
            target: "ucroe",
            event = "latency",
            function = %key,
            duration_ms = duration.as_millis(),
            service = ?self.service_name,
            "Guarded call latency"
        );
    }
}
