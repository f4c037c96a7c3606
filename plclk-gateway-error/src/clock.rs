use thiserror::Error;

/// Provider-reported rejection of a runtime clock request.
///
/// Non-fatal: surfaced to the requesting client, the component keeps serving.
#[derive(Error, Debug, Default, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// No clock binding is live to serve the request.
    #[error("clock binding unavailable")]
    #[default]
    ServiceUnavailable,
    /// The provider would not apply the requested rate.
    #[error("rate {rate} Hz rejected by provider (code {code})")]
    RateRejected { rate: u64, code: i32 },
    /// Enable was refused, e.g. resource contention on the parent chain.
    #[error("clock enable refused (code {code})")]
    EnableRefused { code: i32 },
    /// The provider backend failed underneath an otherwise valid request.
    #[error("provider backend failure during {op} (code {code})")]
    Backend { op: &'static str, code: i32 },
}

impl ClockError {
    /// The provider's own diagnostic code, for propagation into
    /// [`BindError::ProviderRejected`](crate::bind::BindError) when a
    /// post-bind step fails during bring-up.
    pub const fn provider_code(&self) -> i32 {
        match self {
            ClockError::ServiceUnavailable => -19,
            ClockError::RateRejected { code, .. } => *code,
            ClockError::EnableRefused { code } => *code,
            ClockError::Backend { code, .. } => *code,
        }
    }

    pub const fn wire_code(&self) -> i32 {
        match self {
            ClockError::ServiceUnavailable => -19,
            ClockError::RateRejected { .. } => -16,
            ClockError::EnableRefused { .. } => -17,
            ClockError::Backend { .. } => -18,
        }
    }
}
