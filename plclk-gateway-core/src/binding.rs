//! Exclusive ownership of the one bound clock output.

use crate::{
    provider::{ClockOutput, ClockProvider},
    resolver::resolve,
};
use plclk_gateway_error::{bind::BindError, ClockResult};
use plclk_gateway_models::{settings, ClockId, ClockLocator};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Post-bind steps, both optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindOptions {
    pub initial_rate: Option<u64>,
    pub enable_on_bind: bool,
}

impl From<&settings::Clock> for BindOptions {
    fn from(clock: &settings::Clock) -> Self {
        BindOptions {
            initial_rate: clock.initial_rate,
            enable_on_bind: clock.enable_on_bind,
        }
    }
}

struct Guarded {
    output: Box<dyn ClockOutput>,
    /// Locally tracked enable state; release uses it to decide whether a
    /// best-effort disable is due.
    enabled: bool,
}

/// The process-wide clock handle.
///
/// Exactly one exists per process, created by [`ClockBinding::bind`] and
/// destroyed by [`ClockBinding::release`]. Mutating operations serialize on
/// the write lock, so two concurrent rate changes land in some order but
/// never interleave; rate reads take the read lock.
pub struct ClockBinding {
    id: ClockId,
    guarded: RwLock<Guarded>,
}

impl std::fmt::Debug for ClockBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockBinding")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl ClockBinding {
    /// Resolve the locator and take ownership of the clock output.
    ///
    /// If a configured post-bind step fails, the just-acquired output is
    /// released before the error returns; a partially initialized handle
    /// never escapes.
    #[instrument(level = "info", skip(tree, provider))]
    pub async fn bind(
        tree: &plclk_gateway_models::PlatformTree,
        provider: &dyn ClockProvider,
        locator: &ClockLocator,
        options: BindOptions,
    ) -> Result<Self, BindError> {
        let id = resolve(tree, locator)?;
        info!(output = %id.output, index = id.index, "resolved clock output");

        let output = provider.request(&id).await?;
        let parents = output.parents().await;
        if !parents.is_empty() {
            info!(output = %id.output, parents = ?parents, "clock parent chain");
        }
        let binding = ClockBinding {
            id,
            guarded: RwLock::new(Guarded {
                output,
                enabled: false,
            }),
        };

        if let Some(rate) = options.initial_rate {
            if let Err(e) = binding.set_rate(rate).await {
                warn!(rate, err = %e, "initial rate rejected, releasing clock");
                let code = e.provider_code();
                binding.release_inner().await;
                return Err(BindError::ProviderRejected(code));
            }
        }
        if options.enable_on_bind {
            if let Err(e) = binding.set_enabled(true).await {
                warn!(err = %e, "post-bind enable failed, releasing clock");
                let code = e.provider_code();
                binding.release_inner().await;
                return Err(BindError::ProviderRejected(code));
            }
        }
        Ok(binding)
    }

    #[inline]
    pub fn id(&self) -> &ClockId {
        &self.id
    }

    /// Provider-reported current rate.
    pub async fn get_rate(&self) -> u64 {
        self.guarded.read().await.output.rate().await
    }

    /// Delegate a rate change; returns the rate the provider settled on.
    pub async fn set_rate(&self, rate: u64) -> ClockResult<u64> {
        let guarded = self.guarded.write().await;
        guarded.output.set_rate(rate).await
    }

    /// Enable or disable. Enable failures propagate; disable always
    /// succeeds, including when the clock was never enabled.
    pub async fn set_enabled(&self, on: bool) -> ClockResult<()> {
        let mut guarded = self.guarded.write().await;
        if on {
            guarded.output.enable().await?;
            guarded.enabled = true;
        } else {
            guarded.output.disable().await;
            guarded.enabled = false;
        }
        Ok(())
    }

    pub async fn is_enabled(&self) -> bool {
        self.guarded.read().await.enabled
    }

    /// Informational parent chain as reported by the provider.
    pub async fn parents(&self) -> Vec<String> {
        self.guarded.read().await.output.parents().await
    }

    /// Disable if currently enabled, then relinquish the output.
    ///
    /// Release must always complete, so disable here is best-effort; the
    /// backend logs its own failures.
    pub async fn release(self: Arc<Self>) {
        match Arc::try_unwrap(self) {
            Ok(binding) => binding.release_inner().await,
            Err(shared) => {
                // A session still holds a reference; disable through the
                // lock and let the last drop relinquish the output.
                warn!("clock binding released while still referenced");
                let mut guarded = shared.guarded.write().await;
                if guarded.enabled {
                    guarded.output.disable().await;
                    guarded.enabled = false;
                }
            }
        }
    }

    async fn release_inner(self) {
        let ClockBinding { id, guarded } = self;
        let guarded = guarded.into_inner();
        if guarded.enabled {
            guarded.output.disable().await;
        }
        info!(output = %id.output, "released clock output");
    }
}
