//! @acp:module "Errors"
//! @acp:summary "Library error type and the top-level outcome of an invocation"
//! @acp:domain cli
//! @acp:layer core
//!
//! Two families live here. [`CliError`] covers failures raised by the
//! library itself. [`Halt`] is what a command invocation ends with when it
//! does not simply succeed: either a deliberate exit carrying a status, a
//! user interrupt, or a failure carrying its cause.

use std::backtrace::Backtrace;
use std::path::PathBuf;

use thiserror::Error;

/// Library result alias
pub type Result<T> = std::result::Result<T, CliError>;

/// Failures raised by the tether library
#[derive(Debug, Error)]
pub enum CliError {
    #[error("no such command: {0}")]
    UnknownParser(String),

    #[error("command already registered: {0}")]
    DuplicateParser(String),

    #[error("add_subparsers has been disabled; use the subparsers() accessor")]
    SubparsersDisabled,

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("duplicate profile: {0}")]
    DuplicateProfile(String),

    #[error("invalid profile store {path}: {reason}")]
    InvalidStore { path: PathBuf, reason: String },

    #[error("invalid server URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid API key: expected consumer_key:token_key:token_secret")]
    InvalidApiKey,

    /// A command has failed during execution
    #[error("{0}")]
    Command(String),

    /// The user asked the invocation to stop
    #[error("interrupted")]
    Interrupted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// How an invocation stopped short of plain success.
///
/// Deliberate exits and failures are kept apart: an exit carries the status
/// the command chose and is never escalated, a failure carries its cause and
/// goes through the driver's escalation policy.
#[derive(Debug)]
pub enum Halt {
    /// Deliberate exit with the given status
    Exit(u8),
    /// The user interrupted the invocation
    Interrupted,
    /// Something went wrong; the trace is taken where the failure
    /// became a halt
    Failure {
        error: anyhow::Error,
        backtrace: Backtrace,
    },
}

impl Halt {
    pub fn failure(error: impl Into<anyhow::Error>) -> Self {
        Halt::Failure {
            error: error.into(),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Exit status the process should end with when this halt is final
    pub fn status(&self) -> u8 {
        match self {
            Halt::Exit(code) => *code,
            Halt::Interrupted => 1,
            Halt::Failure { .. } => 1,
        }
    }
}

impl From<anyhow::Error> for Halt {
    fn from(error: anyhow::Error) -> Self {
        Halt::failure(error)
    }
}

impl From<CliError> for Halt {
    fn from(error: CliError) -> Self {
        match error {
            CliError::Interrupted => Halt::Interrupted,
            other => Halt::failure(other),
        }
    }
}

impl From<std::io::Error> for Halt {
    fn from(error: std::io::Error) -> Self {
        CliError::from(error).into()
    }
}

/// Outcome of a single command invocation
pub type Outcome<T = ()> = std::result::Result<T, Halt>;
