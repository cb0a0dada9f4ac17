use std::time::Duration;
use thiserror::Error;

/// Boxed error carried as the cause of an [`Error::Execution`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure returned by every bridge operation.
///
/// A bridge call either returns its value or exactly one of these variants.
#[derive(Error, Debug)]
pub enum Error {
    /// The asynchronous operation terminated with an error, or finished
    /// without producing the result the caller asked for.
    #[error("asynchronous operation failed: {0}")]
    Execution(#[source] BoxError),

    /// The blocking wait was interrupted before a terminal signal arrived.
    ///
    /// The waiting thread's interrupt status is still set when this is
    /// returned.
    #[error("blocking wait was interrupted")]
    Interrupted,

    /// No terminal signal arrived within the wait budget.
    #[error("no result delivered within {0:?}")]
    Timeout(Duration),
}

impl Error {
    pub fn execution(cause: impl Into<BoxError>) -> Self {
        Self::Execution(cause.into())
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The wrapped cause of an execution failure.
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Execution(cause) => Some(cause.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single-valued producer completed without emitting a value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation completed without producing a result")]
pub struct MissingResult;

/// The executor dropped a submitted job before running it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("executor dropped the task before it ran")]
pub struct TaskRejected;

/// Every resume handle of a suspended computation was dropped unused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("continuation dropped without being resumed")]
pub struct Abandoned;

/// A runtime-backed source was subscribed from the only thread able to
/// drive it, which would then block waiting for it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("source runtime is driven by the blocked thread and cannot make progress")]
pub struct RuntimeStalled;

/// A panic captured while starting an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("panicked: {message}")]
pub struct Panicked {
    pub message: String,
}

impl Panicked {
    pub(crate) fn from_payload(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { message }
    }
}

/// Invalid bridge configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to start worker pool: {0}")]
    Pool(String),

    #[error("global worker pool is already initialized")]
    AlreadyInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn execution_keeps_cause() {
        let err = Error::execution("boom");
        assert!(err.is_execution());
        assert_eq!(err.cause().unwrap().to_string(), "boom");
        assert_eq!(err.source().unwrap().to_string(), "boom");
        assert_eq!(err.to_string(), "asynchronous operation failed: boom");
    }

    #[test]
    fn missing_result_is_downcastable() {
        let err = Error::execution(MissingResult);
        assert!(err.cause().unwrap().downcast_ref::<MissingResult>().is_some());
    }

    #[test]
    fn panic_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(Panicked::from_payload(payload.as_ref()).message, "static");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(Panicked::from_payload(payload.as_ref()).message, "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(
            Panicked::from_payload(payload.as_ref()).message,
            "non-string panic payload"
        );
    }

    #[test]
    fn predicates() {
        assert!(Error::Interrupted.is_interrupted());
        assert!(Error::Timeout(Duration::from_millis(5)).is_timeout());
        assert!(Error::Interrupted.cause().is_none());
    }
}
