//! Metrics trait for guard observability

use std::time::Duration;

/// How a guarded call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    /// The wrapped function succeeded and its result was cached
    Success,
    /// The wrapped function failed and a cached result was returned
    Fallback,
    /// The wrapped function failed and nothing was cached
    Unrecovered,
}

impl CallOutcome {
    /// Get outcome as string label
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::Fallback => "fallback",
            CallOutcome::Unrecovered => "unrecovered",
        }
    }
}

/// Trait for guard metrics
///
/// Implement this to integrate with your metrics system (Prometheus, StatsD, etc.)
pub trait GuardMetrics: Send + Sync + 'static {
    /// Record how a call to the function cached under `key` ended
    fn record_outcome(&self, key: &str, outcome: CallOutcome);

    /// Record how long the wrapped function itself ran
    fn record_latency(&self, key: &str, duration: Duration);
}

/// No-op metrics implementation (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl GuardMetrics for NoopMetrics {
    #[inline]
    fn record_outcome(&self, _key: &str, _outcome: CallOutcome) {}

    #[inline]
    fn record_latency(&self, _key: &str, _duration: Duration) {}
}

/// Metrics adapter using the `metrics` crate
///
/// # Example
/// ```ignore
/// use ucroe_core::MetricsCrateAdapter;
///
/// // Set up a metrics recorder first (e.g. a Prometheus exporter)
/// let metrics = MetricsCrateAdapter::new("ucroe");
/// // Emits: ucroe_calls_total{outcome=...}, ucroe_call_duration_seconds
/// ```
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    prefix: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    /// Create a new adapter with the given metric name prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn metric_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }
}

#[cfg(feature = "metrics")]
impl GuardMetrics for MetricsCrateAdapter {
    fn record_outcome(&self, key: &str, outcome: CallOutcome) {
        metrics::counter!(
            self.metric_name("calls_total"),
            "function" => key.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    fn record_latency(&self, key: &str, duration: Duration) {
        metrics::histogram!(
            self.metric_name("call_duration_seconds"),
            "function" => key.to_string()
        )
        .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_as_str() {
        assert_eq!(CallOutcome::Success.as_str(), "success");
        assert_eq!(CallOutcome::Fallback.as_str(), "fallback");
        assert_eq!(CallOutcome::Unrecovered.as_str(), "unrecovered");
    }

    #[test]
    fn test_noop_metrics() {
        let metrics = NoopMetrics;
        metrics.record_outcome("key", CallOutcome::Fallback);
        metrics.record_latency("key", Duration::from_millis(1));
    }
}
