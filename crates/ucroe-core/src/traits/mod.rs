//! Core traits for guarded calls

mod backend;
mod key;
mod metrics;
mod serializer;

#[cfg(feature = "tracing")]
mod tracing;

pub use backend::CacheBackend;
pub use key::qualified_name;
pub use metrics::{CallOutcome, GuardMetrics, NoopMetrics};
pub use serializer::Serializer;

#[cfg(feature = "json")]
pub use serializer::JsonSerializer;

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;

#[cfg(feature = "bincode")]
pub use serializer::BincodeSerializer;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;

#[cfg(feature = "tracing")]
pub use self::tracing::TracingMetrics;
