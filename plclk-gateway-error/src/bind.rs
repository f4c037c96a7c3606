use thiserror::Error;

/// Clock resolution/acquisition errors.
///
/// Fatal to start-up: no clock means no usable device, and any registration
/// already performed must be unwound before the error is reported.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The configuration node named by the locator is absent from the
    /// platform tree.
    #[error("platform node '{0}' not found")]
    NodeNotFound(String),
    /// The provider node exists but its output-name list does not contain
    /// the requested output.
    #[error("clock output '{output}' not listed by provider '{provider}'")]
    OutputNotFound { provider: String, output: String },
    /// The provider refused to hand out the resolved clock; carries the
    /// provider's diagnostic code verbatim.
    #[error("clock provider rejected request (code {0})")]
    ProviderRejected(i32),
}

impl BindError {
    pub const fn wire_code(&self) -> i32 {
        match self {
            BindError::NodeNotFound(_) => -32,
            BindError::OutputNotFound { .. } => -33,
            BindError::ProviderRejected(_) => -34,
        }
    }
}
