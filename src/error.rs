//! Error taxonomy for the worker, per the error handling design:
//! `TypeError` (validation), `Error` (logic/illegal state), network/crypto
//! drops (logged and discarded, never surfaced), and fatal process exits.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RequestError>;

/// The two error kinds a `Response` can carry back over the control channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Malformed request body, unknown enum value, invalid IP, etc.
    #[error("{0}")]
    TypeError(String),
    /// Unknown target id, duplicate id, illegal state transition, etc.
    #[error("{0}")]
    Error(String),
}

impl RequestError {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::TypeError(_) => "TypeError",
            RequestError::Error(_) => "Error",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            RequestError::TypeError(reason) | RequestError::Error(reason) => reason,
        }
    }
}

pub fn type_error(reason: impl Into<String>) -> RequestError {
    RequestError::TypeError(reason.into())
}

pub fn logic_error(reason: impl Into<String>) -> RequestError {
    RequestError::Error(reason.into())
}

/// Failures that abort the whole process after a best-effort log flush:
/// out-of-memory (not modeled), control channel remotely closed, settings
/// validation failure at bring-up, internal invariant violations.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("control channel closed: {0}")]
    ChannelClosed(String),
    #[error("settings validation failed: {0}")]
    SettingsValidation(String),
    #[error("internal invariant violated: {0}")]
    Assertion(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FatalError {
    /// Exit codes per the external interfaces contract: 0 success, 1 fatal,
    /// 42 settings validation error.
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::SettingsValidation(_) => 42,
            _ => 1,
        }
    }
}
