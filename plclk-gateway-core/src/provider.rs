//! Clock provider abstraction and the filesystem-backed implementation.
//!
//! The provider owns the frequency-divider math and the hardware; this crate
//! only ever invokes it. The shipped backend drives a clk control directory
//! (one subdirectory per output with `clk_rate` and `clk_prepare_enable`
//! files); tests substitute an in-memory implementation of the same traits.

use async_trait::async_trait;
use plclk_gateway_error::{bind::BindError, clock::ClockError, ClockResult};
use plclk_gateway_models::ClockId;
use std::{
    io,
    path::PathBuf,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::fs;
use tracing::{debug, warn};

/// One exclusively held clock output.
#[async_trait]
pub trait ClockOutput: Send + Sync {
    fn name(&self) -> &str;

    /// Provider-reported current rate in Hz. Always answers for a live
    /// output; transient backend hiccups fall back to the last seen rate.
    async fn rate(&self) -> u64;

    /// Apply a rate. The provider is authoritative and may quantize; the
    /// achieved rate is returned. No local range validation happens here.
    async fn set_rate(&self, rate: u64) -> ClockResult<u64>;

    /// Enable the output. May fail, e.g. on parent-chain contention.
    async fn enable(&self) -> ClockResult<()>;

    /// Disable the output. Always succeeds and is idempotent.
    async fn disable(&self);

    /// Parent chain, nearest first. Read-only, informational.
    async fn parents(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Hands out exclusive clock outputs.
#[async_trait]
pub trait ClockProvider: Send + Sync {
    async fn request(&self, id: &ClockId) -> Result<Box<dyn ClockOutput>, BindError>;
}

/// Negative diagnostic code for an I/O failure, errno-valued when available.
#[inline]
fn io_code(e: &io::Error) -> i32 {
    e.raw_os_error().map(|n| -n).unwrap_or(-5)
}

/// Provider backend over a clk control directory.
pub struct FsClockProvider {
    root: PathBuf,
}

impl FsClockProvider {
    pub fn new(root: PathBuf) -> Self {
        FsClockProvider { root }
    }
}

#[async_trait]
impl ClockProvider for FsClockProvider {
    async fn request(&self, id: &ClockId) -> Result<Box<dyn ClockOutput>, BindError> {
        let dir = self.root.join(&id.output);
        // An output the controller exports always has a readable rate file;
        // anything else is the provider refusing the request.
        let initial = fs::read_to_string(dir.join(RATE_FILE))
            .await
            .map_err(|e| {
                warn!(output = %id.output, err = %e, "provider has no such output");
                BindError::ProviderRejected(io_code(&e))
            })?;
        let initial = parse_rate(&initial).ok_or(BindError::ProviderRejected(-22))?;
        debug!(output = %id.output, index = id.index, rate = initial, "acquired clock output");
        Ok(Box::new(FsClockOutput {
            name: id.output.clone(),
            dir,
            last_rate: AtomicU64::new(initial),
        }))
    }
}

const RATE_FILE: &str = "clk_rate";
const ENABLE_FILE: &str = "clk_prepare_enable";
const PARENT_FILE: &str = "clk_parent";

struct FsClockOutput {
    name: String,
    dir: PathBuf,
    last_rate: AtomicU64,
}

fn parse_rate(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

#[async_trait]
impl ClockOutput for FsClockOutput {
    fn name(&self) -> &str {
        &self.name
    }

    async fn rate(&self) -> u64 {
        match fs::read_to_string(self.dir.join(RATE_FILE)).await {
            Ok(raw) => match parse_rate(&raw) {
                Some(rate) => {
                    self.last_rate.store(rate, Ordering::Release);
                    rate
                }
                None => {
                    warn!(clock = %self.name, raw = raw.trim(), "unparseable rate from provider");
                    self.last_rate.load(Ordering::Acquire)
                }
            },
            Err(e) => {
                warn!(clock = %self.name, err = %e, "rate read failed");
                self.last_rate.load(Ordering::Acquire)
            }
        }
    }

    async fn set_rate(&self, rate: u64) -> ClockResult<u64> {
        fs::write(self.dir.join(RATE_FILE), format!("{rate}\n"))
            .await
            .map_err(|e| ClockError::RateRejected {
                rate,
                code: io_code(&e),
            })?;
        // Read back what the divider actually settled on.
        let achieved = fs::read_to_string(self.dir.join(RATE_FILE))
            .await
            .map_err(|e| ClockError::Backend {
                op: "set_rate",
                code: io_code(&e),
            })?;
        let achieved = parse_rate(&achieved).ok_or(ClockError::Backend {
            op: "set_rate",
            code: -22,
        })?;
        self.last_rate.store(achieved, Ordering::Release);
        Ok(achieved)
    }

    async fn enable(&self) -> ClockResult<()> {
        fs::write(self.dir.join(ENABLE_FILE), "1\n")
            .await
            .map_err(|e| ClockError::EnableRefused { code: io_code(&e) })
    }

    async fn disable(&self) {
        if let Err(e) = fs::write(self.dir.join(ENABLE_FILE), "0\n").await {
            warn!(clock = %self.name, err = %e, "disable write failed");
        }
    }

    async fn parents(&self) -> Vec<String> {
        match fs::read_to_string(self.dir.join(PARENT_FILE)).await {
            Ok(raw) => raw.split_whitespace().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }
}
