//! CLI-specific error types and exit code mapping

use catcher_core::error::CatcherError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Cannot reach the daemon (stream server or syslog target).
    #[error("daemon not reachable: {0}")]
    DaemonUnavailable(String),

    /// The stream server refused the subscription.
    #[error("subscription rejected: {0}")]
    Rejected(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from catcher-core.
    #[error("{0}")]
    Core(#[from] CatcherError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                        |
    /// |------|--------------------------------|
    /// | 0    | Success                        |
    /// | 1    | General / command error        |
    /// | 2    | Configuration error            |
    /// | 3    | Daemon unreachable             |
    /// | 4    | Subscription rejected          |
    /// | 10   | IO error                       |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::DaemonUnavailable(_) => 3,
            Self::Rejected(_) => 4,
            Self::Io(_) => 10,
            Self::Core(CatcherError::Config(_)) => 2,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<catcher_log_pipeline::LogPipelineError> for CliError {
    fn from(e: catcher_log_pipeline::LogPipelineError) -> Self {
        Self::Config(e.to_string())
    }
}
