//! Error returned by a guarded call

use thiserror::Error;

use ucroe_core::CacheError;

/// Failure of a guarded call
#[derive(Error, Debug)]
pub enum GuardError<E> {
    /// The wrapped function failed and nothing was cached; the original
    /// error, unchanged
    #[error("{0}")]
    Call(E),

    /// Backend resolution, storage or serialization failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl<E> GuardError<E> {
    /// Whether this is the wrapped function's own error
    pub fn is_call(&self) -> bool {
        matches!(self, GuardError::Call(_))
    }

    /// The wrapped function's error, if that is what this is
    pub fn into_call_error(self) -> Option<E> {
        match self {
            GuardError::Call(err) => Some(err),
            GuardError::Cache(_) => None,
        }
    }

    /// Collapse into the wrapped function's error type
    ///
    /// Keeps a guarded function's signature identical to the unguarded one.
    pub fn flatten(self) -> E
    where
        E: From<CacheError>,
    {
        match self {
            GuardError::Call(err) => err,
            GuardError::Cache(err) => E::from(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum AppError {
        Upstream(&'static str),
        Cache(CacheError),
    }

    impl From<CacheError> for AppError {
        fn from(err: CacheError) -> Self {
            AppError::Cache(err)
        }
    }

    #[test]
    fn test_flatten_keeps_call_error() {
        let err: GuardError<AppError> = GuardError::Call(AppError::Upstream("timeout"));
        assert!(err.is_call());
        assert_eq!(err.flatten(), AppError::Upstream("timeout"));
    }

    #[test]
    fn test_flatten_converts_cache_error() {
        let err: GuardError<AppError> = CacheError::Backend("down".to_string()).into();
        assert!(!err.is_call());
        assert_eq!(
            err.flatten(),
            AppError::Cache(CacheError::Backend("down".to_string()))
        );
    }

    #[test]
    fn test_display() {
        let err: GuardError<String> = GuardError::Call("boom".to_string());
        assert_eq!(err.to_string(), "boom");

        let err: GuardError<String> = CacheError::UnknownBackend("x".to_string()).into();
        assert_eq!(err.to_string(), "unknown cache backend: x");
        assert_eq!(err.into_call_error(), None);
    }
}
