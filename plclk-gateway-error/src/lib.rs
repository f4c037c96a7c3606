pub mod bind;
pub mod clock;
pub mod protocol;
pub mod registration;

use anyhow::Error as AnyhowError;
use bind::BindError;
use clock::ClockError;
use config::ConfigError;
use protocol::ProtocolError;
use registration::RegistrationError;
use std::io::Error as IoError;
use thiserror::Error;

pub type PlclkResult<T, E = PlclkError> = anyhow::Result<T, E>;
pub type BindResult<T, E = BindError> = Result<T, E>;
pub type ClockResult<T, E = ClockError> = Result<T, E>;

/// Top-level error for the daemon binaries.
///
/// The domain enums below stay closed; this umbrella exists so start-up code
/// can bubble any of them plus I/O and configuration failures through one
/// `PlclkResult` without widening the domain types themselves.
#[derive(Error, Debug)]
pub enum PlclkError {
    #[error("{0}")]
    Registration(#[from] RegistrationError),
    #[error("{0}")]
    Bind(#[from] BindError),
    #[error("{0}")]
    Clock(#[from] ClockError),
    #[error("{0}")]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    IoError(#[from] IoError),
    #[error("{0}")]
    ConfigError(#[from] ConfigError),
    #[error("{0}")]
    Anyhow(#[from] AnyhowError),
    #[error("{0}")]
    Msg(String),
}

impl From<String> for PlclkError {
    #[inline]
    fn from(e: String) -> Self {
        PlclkError::Msg(e)
    }
}

impl From<&str> for PlclkError {
    #[inline]
    fn from(e: &str) -> Self {
        PlclkError::Msg(e.to_string())
    }
}

impl PlclkError {
    /// Wire-level code for this error, for exit statuses and response frames.
    ///
    /// Codes live in fixed negative bands per domain so a raw status is
    /// attributable without the enum in hand:
    ///
    /// | band | domain |
    /// |---|---|
    /// | -1..-15  | protocol |
    /// | -16..-31 | clock runtime |
    /// | -32..-47 | bind |
    /// | -48..-63 | registration |
    /// | -64      | everything else |
    pub fn wire_code(&self) -> i32 {
        match self {
            PlclkError::Registration(e) => e.wire_code(),
            PlclkError::Bind(e) => e.wire_code(),
            PlclkError::Clock(e) => e.wire_code(),
            PlclkError::Protocol(e) => e.wire_code(),
            _ => -64,
        }
    }
}
