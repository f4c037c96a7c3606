//! Translation of control requests into clock-binding primitives.
//!
//! One dispatcher serves one client session: it is idle between requests and
//! processing during one, never more, since a session issues requests
//! synchronously. No business logic lives here, only argument checking and
//! delegation.

use crate::BindingSlot;
use plclk_gateway_error::clock::ClockError;
use plclk_gateway_models::{ControlRequest, ControlResponse, READ_TEXT_CAP};
use tracing::{debug, instrument};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DispatchState {
    Idle,
    Processing,
}

pub struct Dispatcher {
    binding: BindingSlot,
    state: DispatchState,
}

impl Dispatcher {
    pub fn new(binding: BindingSlot) -> Self {
        Dispatcher {
            binding,
            state: DispatchState::Idle,
        }
    }

    /// Serve one request to completion.
    #[instrument(level = "debug", skip(self))]
    pub async fn handle(&mut self, request: ControlRequest) -> ControlResponse {
        debug_assert_eq!(self.state, DispatchState::Idle);
        self.state = DispatchState::Processing;
        let response = self.serve(request).await;
        self.state = DispatchState::Idle;
        response
    }

    async fn serve(&self, request: ControlRequest) -> ControlResponse {
        let Some(binding) = self.binding.load_full() else {
            debug!("request arrived with no live clock binding");
            return ControlResponse::err(ClockError::ServiceUnavailable.wire_code());
        };
        match request {
            ControlRequest::GetRate => ControlResponse::ok_rate(binding.get_rate().await),
            ControlRequest::SetRate(rate) => match binding.set_rate(rate).await {
                Ok(achieved) => ControlResponse::ok_rate(achieved),
                Err(e) => ControlResponse::err(e.wire_code()),
            },
            ControlRequest::SetEnabled(on) => match binding.set_enabled(on).await {
                Ok(()) => ControlResponse::ok(),
                Err(e) => ControlResponse::err(e.wire_code()),
            },
            ControlRequest::Read { offset, len } => {
                ControlResponse::ok_bytes(read_view(binding.get_rate().await, offset, len))
            }
        }
    }
}

/// Legacy seek-based text view: the rate as decimal ASCII plus a newline,
/// with standard short-read semantics over a bounded buffer.
fn read_view(rate: u64, offset: u64, len: u32) -> Vec<u8> {
    let mut text = format!("{rate}\n").into_bytes();
    text.truncate(READ_TEXT_CAP);
    let Ok(offset) = usize::try_from(offset) else {
        return Vec::new();
    };
    if offset >= text.len() {
        return Vec::new();
    }
    let end = text.len().min(offset.saturating_add(len as usize));
    text[offset..end].to_vec()
}
