use thiserror::Error;

/// Malformed or unsupported control traffic.
///
/// Non-fatal: reported to the offending client, no state is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Operation code outside the closed dispatch set. Rejected, not ignored.
    #[error("unsupported operation code {0:#04x}")]
    UnsupportedOperation(u8),
    /// Frame or payload did not decode to the shape its opcode requires.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// Frame length prefix exceeds the protocol maximum.
    #[error("frame of {len} bytes exceeds maximum {max}")]
    OversizedFrame { len: u32, max: u32 },
}

impl ProtocolError {
    #[inline]
    pub fn malformed(reason: impl Into<String>) -> Self {
        ProtocolError::MalformedRequest(reason.into())
    }

    pub const fn wire_code(&self) -> i32 {
        match self {
            ProtocolError::UnsupportedOperation(_) => -1,
            ProtocolError::MalformedRequest(_) => -2,
            ProtocolError::OversizedFrame { .. } => -3,
        }
    }
}
