//! Process context: everything start-up constructs, owned in one place.
//!
//! There is no ambient global state; the binaries build an `AppContext`,
//! pass it by reference, and drive shutdown through it.

use crate::{
    binding::{BindOptions, ClockBinding},
    gateway::DeviceGateway,
    provider::ClockProvider,
    BindingSlot,
};
use arc_swap::ArcSwapOption;
use plclk_gateway_error::{PlclkError, PlclkResult};
use plclk_gateway_models::{PlatformTree, Settings};
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct AppContext {
    settings: Settings,
    provider: Arc<dyn ClockProvider>,
    gateway: DeviceGateway,
    binding: BindingSlot,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext").finish_non_exhaustive()
    }
}

impl AppContext {
    /// Bring the component up: register the device, then resolve and bind
    /// the clock. A failure anywhere after registration unwinds the
    /// registration before the error is returned, leaving no dangling endpoint.
    #[instrument(level = "info", skip_all)]
    pub async fn start_up(
        settings: Settings,
        provider: Arc<dyn ClockProvider>,
    ) -> PlclkResult<Self> {
        let gateway = DeviceGateway::new(settings.device.socket_path.clone());
        let binding: BindingSlot = Arc::new(ArcSwapOption::empty());

        gateway.start(binding.clone()).await?;

        match Self::bind_clock(&settings, provider.as_ref()).await {
            Ok(bound) => binding.store(Some(Arc::new(bound))),
            Err(e) => {
                error!(err = %e, "clock bind failed, unwinding registration");
                gateway.stop().await;
                return Err(e);
            }
        }

        info!(socket = %settings.device.socket_path.display(), "gateway up");
        Ok(AppContext {
            settings,
            provider,
            gateway,
            binding,
        })
    }

    async fn bind_clock(
        settings: &Settings,
        provider: &dyn ClockProvider,
    ) -> PlclkResult<ClockBinding> {
        let tree = PlatformTree::load(&settings.platform.tree_dir).map_err(PlclkError::from)?;
        let binding = ClockBinding::bind(
            &tree,
            provider,
            &settings.clock.locator(),
            BindOptions::from(&settings.clock),
        )
        .await?;
        Ok(binding)
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn provider(&self) -> &Arc<dyn ClockProvider> {
        &self.provider
    }

    /// Current binding, if the component is between bind and shutdown.
    pub fn binding(&self) -> Option<Arc<ClockBinding>> {
        self.binding.load_full()
    }

    /// Serve until SIGINT or SIGTERM, then shut down.
    pub async fn run(&self) -> PlclkResult<()> {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .map_err(PlclkError::from)?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("interrupt received"),
            _ = terminate.recv() => info!("terminate received"),
        }
        self.shutdown().await;
        Ok(())
    }

    /// Tear down in strict reverse of start-up: dispatch is cut off first,
    /// the clock is released, and the registration goes last.
    #[instrument(level = "info", skip_all)]
    pub async fn shutdown(&self) {
        if let Some(binding) = self.binding.swap(None) {
            binding.release().await;
        }
        self.gateway.stop().await;
        info!("gateway down");
    }
}
