//! The fallback guard
//!
//! A guard runs a fallible function. On success the result is cached under
//! the function's key; on failure the last cached result is returned in
//! place of the error. When nothing has been cached yet the error is
//! returned unchanged.
//!
//! The key identifies the function only. Calls with different arguments
//! share one cache slot.

mod error;

pub use error::GuardError;

use std::fmt;
use std::future::Future;
use std::panic::Location;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use ucroe_core::{
    CacheBackend, CallOutcome, GuardMetrics, JsonSerializer, Result, Serializer,
};

use crate::resolver::GlobalConfig;

/// Details of a fallback, handed to the `on_exception` callback
#[derive(Debug, Clone)]
pub struct FallbackEvent<'a> {
    /// Cache key of the guarded function
    pub key: &'a str,
    /// The error that was replaced by the cached value
    pub error: String,
    /// Where the guarded function was called from
    pub caller: &'static Location<'static>,
}

/// Callback run once per fallback
pub type ExceptionCallback = Arc<dyn Fn(&FallbackEvent<'_>) + Send + Sync>;

/// Conversion into an [`ExceptionCallback`]
///
/// Implemented for closures and functions taking a `&FallbackEvent` and
/// for ones taking no argument at all. `Args` only tells the two apart.
pub trait IntoExceptionCallback<Args> {
    /// Box the callback
    fn into_callback(self) -> ExceptionCallback;
}

impl<F> IntoExceptionCallback<(&'static FallbackEvent<'static>,)> for F
where
    F: Fn(&FallbackEvent<'_>) + Send + Sync + 'static,
{
    fn into_callback(self) -> ExceptionCallback {
        Arc::new(self)
    }
}

impl<F> IntoExceptionCallback<()> for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn into_callback(self) -> ExceptionCallback {
        event_callback(move |_| self())
    }
}

fn event_callback<F>(callback: F) -> ExceptionCallback
where
    F: Fn(&FallbackEvent<'_>) + Send + Sync + 'static,
{
    Arc::new(callback)
}

struct Binding {
    cache: Arc<dyn CacheBackend>,
    log_exception: bool,
}

/// Guard that substitutes the last cached result when a call fails
///
/// The backend and the logging flag are bound on first use, not at
/// construction, so configuration changes made before the first call are
/// observed. Explicit options win over the resolver.
///
/// ```
/// use ucroe::CachedResultOnException;
///
/// static GUARD: CachedResultOnException = CachedResultOnException::new();
///
/// fn rate() -> Result<f64, std::io::Error> {
///     GUARD
///         .invoke("rate", || Ok::<_, std::io::Error>(1.25))
///         .map_err(|e| std::io::Error::other(e.to_string()))
/// }
///
/// assert_eq!(rate().unwrap(), 1.25);
/// ```
pub struct CachedResultOnException<S = JsonSerializer> {
    cache: Option<Arc<dyn CacheBackend>>,
    log_exception: Option<bool>,
    on_exception: Option<ExceptionCallback>,
    config: Option<Arc<GlobalConfig>>,
    metrics: Option<Arc<dyn GuardMetrics>>,
    serializer: S,
    bound: OnceLock<Binding>,
}

impl CachedResultOnException<JsonSerializer> {
    /// Create a guard that takes every option from the resolver
    pub const fn new() -> Self {
        Self {
            cache: None,
            log_exception: None,
            on_exception: None,
            config: None,
            metrics: None,
            serializer: JsonSerializer,
            bound: OnceLock::new(),
        }
    }

    /// Create a builder
    pub fn builder() -> GuardBuilder<JsonSerializer> {
        GuardBuilder::new()
    }
}

impl Default for CachedResultOnException<JsonSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> CachedResultOnException<S> {
    fn binding(&self) -> Result<&Binding> {
        if let Some(binding) = self.bound.get() {
            return Ok(binding);
        }

        let config = match &self.config {
            Some(config) => config.clone(),
            None => GlobalConfig::global(),
        };
        let cache = match &self.cache {
            Some(cache) => cache.clone(),
            None => config.create_backend()?,
        };
        let log_exception = match self.log_exception {
            Some(flag) => flag,
            None => config.log_exception_by_default()?,
        };

        // A concurrent first call may have bound already; its binding wins.
        Ok(self.bound.get_or_init(|| Binding {
            cache,
            log_exception,
        }))
    }

    /// The backend this guard uses, binding it if needed
    pub fn cache(&self) -> Result<Arc<dyn CacheBackend>> {
        Ok(self.binding()?.cache.clone())
    }

    /// Whether fallbacks are logged, binding if needed
    pub fn log_exception(&self) -> Result<bool> {
        Ok(self.binding()?.log_exception)
    }

    /// Whether the backend has been bound yet
    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Run `f`, caching its result under `key` or falling back to the
    /// cached one when it fails
    ///
    /// Every call with the same `key` shares one slot, whatever arguments
    /// `f` closes over.
    #[track_caller]
    pub fn invoke<T, E, F>(&self, key: &str, f: F) -> std::result::Result<T, GuardError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let caller = Location::caller();
        let binding = self.binding()?;

        let start = Instant::now();
        let outcome = f();
        self.record_latency(key, start);

        self.settle(binding, key, caller, outcome)
    }

    /// Async counterpart of [`invoke`](Self::invoke)
    #[track_caller]
    pub fn invoke_async<T, E, Fut>(
        &self,
        key: &str,
        fut: Fut,
    ) -> impl Future<Output = std::result::Result<T, GuardError<E>>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let caller = Location::caller();

        async move {
            let binding = self.binding()?;

            let start = Instant::now();
            let outcome = fut.await;
            self.record_latency(key, start);

            self.settle(binding, key, caller, outcome)
        }
    }

    fn settle<T, E>(
        &self,
        binding: &Binding,
        key: &str,
        caller: &'static Location<'static>,
        outcome: std::result::Result<T, E>,
    ) -> std::result::Result<T, GuardError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: fmt::Display,
    {
        match outcome {
            Ok(value) => {
                // A result that cannot be cached is still the caller's result.
                match self.serializer.serialize_checked(&value) {
                    Ok(bytes) => binding.cache.set(key, bytes)?,
                    Err(e) => {
                        warn!(
                            target: "ucroe",
                            function = %key,
                            serializer = self.serializer.name(),
                            error = %e,
                            "Result of {} is not cacheable, keeping the previous entry",
                            key
                        );
                    }
                }
                self.record_outcome(key, CallOutcome::Success);
                Ok(value)
            }
            Err(err) => {
                let Some(bytes) = binding.cache.get(key)? else {
                    self.record_outcome(key, CallOutcome::Unrecovered);
                    return Err(GuardError::Call(err));
                };
                let value: T = match self.serializer.deserialize(&bytes) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            target: "ucroe",
                            function = %key,
                            error = %e,
                            "Cached value of {} is unreadable, returning the original error",
                            key
                        );
                        self.record_outcome(key, CallOutcome::Unrecovered);
                        return Err(GuardError::Call(err));
                    }
                };

                if binding.log_exception {
                    warn!(
                        target: "ucroe",
                        function = %key,
                        error = %err,
                        "{} -> {} raised during execution, cached value will be returned",
                        caller,
                        key
                    );
                }

                if let Some(callback) = &self.on_exception {
                    callback(&FallbackEvent {
                        key,
                        error: err.to_string(),
                        caller,
                    });
                }

                self.record_outcome(key, CallOutcome::Fallback);
                Ok(value)
            }
        }
    }

    fn record_outcome(&self, key: &str, outcome: CallOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(key, outcome);
        }
    }

    fn record_latency(&self, key: &str, start: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.record_latency(key, start.elapsed());
        }
    }
}

impl<S: Serializer> fmt::Debug for CachedResultOnException<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedResultOnException")
            .field("explicit_cache", &self.cache.is_some())
            .field("log_exception", &self.log_exception)
            .field("on_exception", &self.on_exception.is_some())
            .field("serializer", &self.serializer.name())
            .field("bound", &self.is_bound())
            .finish_non_exhaustive()
    }
}

/// Builder for [`CachedResultOnException`]
pub struct GuardBuilder<S = JsonSerializer> {
    cache: Option<Arc<dyn CacheBackend>>,
    log_exception: Option<bool>,
    on_exception: Option<ExceptionCallback>,
    config: Option<Arc<GlobalConfig>>,
    metrics: Option<Arc<dyn GuardMetrics>>,
    serializer: S,
}

impl GuardBuilder<JsonSerializer> {
    /// Create a builder with every option unset
    pub fn new() -> Self {
        Self {
            cache: None,
            log_exception: None,
            on_exception: None,
            config: None,
            metrics: None,
            serializer: JsonSerializer,
        }
    }
}

impl Default for GuardBuilder<JsonSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> GuardBuilder<S> {
    /// Use `backend` instead of resolving one
    pub fn cache(mut self, backend: impl CacheBackend) -> Self {
        self.cache = Some(Arc::new(backend));
        self
    }

    /// Log fallbacks (or not) regardless of the resolved default
    pub fn log_exception(mut self, enabled: bool) -> Self {
        self.log_exception = Some(enabled);
        self
    }

    /// Run `callback` once per fallback
    ///
    /// Takes a `Fn(&FallbackEvent)` or a `Fn()`. Closure arguments need a
    /// type annotation: `|event: &FallbackEvent<'_>| ...`.
    pub fn on_exception<Args>(mut self, callback: impl IntoExceptionCallback<Args>) -> Self {
        self.on_exception = Some(callback.into_callback());
        self
    }

    /// Resolve options from `config` instead of the process-wide instance
    pub fn config(mut self, config: Arc<GlobalConfig>) -> Self {
        self.config = Some(config);
        self
    }

    /// Report call outcomes to `metrics`
    pub fn metrics(mut self, metrics: impl GuardMetrics) -> Self {
        self.metrics = Some(Arc::new(metrics));
        self
    }

    /// Encode cached results with `serializer`
    pub fn serializer<S2: Serializer>(self, serializer: S2) -> GuardBuilder<S2> {
        GuardBuilder {
            cache: self.cache,
            log_exception: self.log_exception,
            on_exception: self.on_exception,
            config: self.config,
            metrics: self.metrics,
            serializer,
        }
    }

    /// Build the guard
    pub fn build(self) -> CachedResultOnException<S> {
        CachedResultOnException {
            cache: self.cache,
            log_exception: self.log_exception,
            on_exception: self.on_exception,
            config: self.config,
            metrics: self.metrics,
            serializer: self.serializer,
            bound: OnceLock::new(),
        }
    }
}
