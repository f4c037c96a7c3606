mod logger;

use clap::Parser;
use logger::Logger;
use plclk_gateway_core::{AppContext, FsClockProvider};
use plclk_gateway_error::{PlclkError, PlclkResult};
use plclk_gateway_models::{constants::DEFAULT_CONFIG_FILE_NAME, Settings};
use std::{env::current_dir, path::PathBuf, sync::Arc};

/// PL clock control gateway
///
/// Binds one platform clock output at start-up and exposes its rate and
/// enable state over a Unix-socket control endpoint.
#[derive(Parser)]
#[command(name = "plclk-gatewayd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PL clock control gateway", long_about = None)]
struct Cli {
    /// Sets a custom config file with full path
    ///
    /// If not specified, the daemon looks for 'plclk-gateway.toml' in the
    /// current working directory.
    #[arg(short, long, env = "PLCLK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> PlclkResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(p) => p,
        None => {
            let dir = current_dir()
                .map_err(|e| PlclkError::from(format!("Failed to get current directory: {e}")))?;
            dir.join(DEFAULT_CONFIG_FILE_NAME)
        }
    };

    let settings = Settings::new(config_path.to_string_lossy().to_string())?;
    let _logger = Logger::init(&settings.log)?;

    let provider = Arc::new(FsClockProvider::new(settings.platform.provider_dir.clone()));
    let ctx = AppContext::start_up(settings, provider).await?;

    ctx.run().await
}
