pub mod binding;
pub mod context;
pub mod dispatch;
pub mod gateway;
pub mod provider;
pub mod resolver;

pub use binding::{BindOptions, ClockBinding};
pub use context::AppContext;
pub use dispatch::Dispatcher;
pub use gateway::DeviceGateway;
pub use provider::{ClockOutput, ClockProvider, FsClockProvider};
pub use resolver::resolve;

use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Shared slot through which dispatch reaches the one live clock binding.
///
/// Empty only during the short window between device registration and bind,
/// and again after shutdown has begun; requests arriving then are answered
/// with a service-unavailable status.
pub type BindingSlot = Arc<ArcSwapOption<ClockBinding>>;
