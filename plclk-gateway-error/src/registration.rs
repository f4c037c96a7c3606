use std::{io, path::PathBuf};
use thiserror::Error;

/// Device registration errors.
///
/// All of these are fatal to start-up: the gateway unwinds whatever it had
/// already allocated and the component does not come up.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// The control endpoint address could not be claimed: the path is
    /// occupied, the parent directory is missing, or the bind itself failed.
    #[error("control endpoint {} unavailable: {reason}", .path.display())]
    AddressUnavailable { path: PathBuf, reason: String },
    /// The accept loop could not be installed after the address was claimed.
    /// The caller has already released the address by the time this is seen.
    #[error("failed to install dispatch loop: {0}")]
    SpawnFailed(String),
}

impl RegistrationError {
    #[inline]
    pub fn address_unavailable(path: impl Into<PathBuf>, err: io::Error) -> Self {
        RegistrationError::AddressUnavailable {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub const fn wire_code(&self) -> i32 {
        match self {
            RegistrationError::AddressUnavailable { .. } => -48,
            RegistrationError::SpawnFailed(_) => -49,
        }
    }
}
