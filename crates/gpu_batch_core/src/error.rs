use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The batch entities that are created and then polled until they settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ComputeEnvironment,
    JobQueue,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::ComputeEnvironment => f.write_str("compute environment"),
            ResourceKind::JobQueue => f.write_str("job queue"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    /// The service reported the entity as `INVALID`.
    /// Carries the service's `statusReason` verbatim.
    #[error("Failed to create {kind}: {reason}")]
    Invalid { kind: ResourceKind, reason: String },

    /// A describe call returned nothing for the requested name or id.
    #[error("{0} not found")]
    NotFound(String),

    /// Transport or service failure reported by the SDK. Never retried.
    #[error("Batch API failure: {0}")]
    Api(String),

    /// The wait was interrupted through its cancellation token.
    #[error("Cancelled while waiting for {0}")]
    Cancelled(String),

    #[error("Timed out after {after:?} while waiting for {what}")]
    TimedOut { what: String, after: Duration },

    /// Writing operator output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = BatchError> = std::result::Result<T, E>;
