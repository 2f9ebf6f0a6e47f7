//! Error types for the macrodrive client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the transport to the automation host process.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to spawn automation host: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("automation host launcher not found. Set `HostConfig::host_exe_path` or install 'macrodrive-host' next to the current executable.")]
    NotFound,

    #[error("automation host process not running")]
    NotRunning,

    #[error("failed to send command to host: {0}")]
    SendFailed(String),

    #[error("failed to read response from host: {0}")]
    ReadFailed(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("host rejected the operation: {0}")]
    Rejected(String),

    #[error("unexpected response data")]
    UnexpectedResponse,
}

/// Registration against a registry that has already been disposed.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("disposal registry is already disposed; no further release actions accepted")]
    AlreadyDisposed,
}

/// One release action that failed during a disposal pass.
#[derive(Debug, Error)]
#[error("{label}: {error}")]
pub struct ReleaseFailure {
    /// Label the action was registered under.
    pub label: String,
    #[source]
    pub error: HostError,
}

/// Every release action that failed during a single disposal pass.
///
/// The pass itself always runs to completion; this reports what broke along
/// the way, so one stale handle never hides the fate of the others.
#[derive(Debug, Error)]
#[error("{} release action(s) failed during teardown: {}", .failures.len(), format_failures(.failures))]
pub struct TeardownError {
    pub failures: Vec<ReleaseFailure>,
}

fn format_failures(failures: &[ReleaseFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors surfaced by an automation session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The path did not resolve to a readable, host-compatible document.
    #[error("failed to open document '{}': {source}", .path.display())]
    DocumentOpen {
        path: PathBuf,
        #[source]
        source: HostError,
    },

    /// The host offers call shapes for zero through nine macro arguments.
    #[error("unsupported macro arity {0}: the host accepts 0-9 arguments")]
    UnsupportedArity(usize),

    #[error("macro '{name}' failed: {source}")]
    MacroInvocation {
        name: String,
        #[source]
        source: HostError,
    },

    #[error("failed to save document to '{}': {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: HostError,
    },

    /// The session has been torn down; no further operations are valid.
    #[error("session is closed")]
    SessionClosed,

    /// A host acquisition step failed during session construction.
    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Teardown(#[from] TeardownError),
}
