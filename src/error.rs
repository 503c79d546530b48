//! Error abstractions.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error variants surfaced by the cluster lifecycle.
///
/// Operations return `anyhow::Result`, with one of these variants at the origin of the failure.
/// Callers which need to tell failures apart should use `downcast_ref::<CloudError>()`.
#[derive(Debug, Error)]
pub enum CloudError {
    /// A required piece of external configuration is absent or malformed.
    #[error("configuration error: {0}")]
    Config(String),
    /// The control plane rejected the login, or did not return a usable token.
    #[error("authentication error: {0}")]
    Auth(String),
    /// The control plane returned a non-2xx response.
    #[error("control plane returned {status}: {body}")]
    ControlPlane { status: u16, body: String },
    /// A readiness predicate was never satisfied within its budget.
    #[error("timed out after {timeout:?} waiting for {description}")]
    TimedOut { description: String, timeout: Duration },
    /// A local file, usually a metadata record, could not be accessed.
    #[error("error accessing {path:?}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The secrets store is unreachable, or the requested secret is absent or incomplete.
    #[error("secrets store error: {0}")]
    Secrets(String),
    /// A step of the sample data upload returned a non-2xx response.
    #[error("sample data upload failed at {step} with {status}: {body}")]
    Upload { step: String, status: u16, body: String },
}

impl CloudError {
    /// Create a config error naming the given missing env var.
    pub fn missing_env(var: &str) -> Self {
        Self::Config(format!("environment variable {} is required", var))
    }

    /// Check if this error is a readiness timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}
