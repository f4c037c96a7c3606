use crate::{
    constants::{
        DEFAULT_OUTPUT_NAME, DEFAULT_PROVIDER_COMPATIBLE, DEFAULT_PROVIDER_DIR, DEFAULT_SOCKET_PATH,
        DEFAULT_TREE_DIR,
    },
    platform::ClockLocator,
};
use config::{Config, File};
use plclk_gateway_error::PlclkResult;
use serde::{self, Deserialize};
use std::{ops::Deref, path::PathBuf, sync::Arc};

#[derive(Debug, Clone)]
pub struct Settings(Arc<Inner>);

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Settings {
    /// Load settings from an optional TOML file plus `PLCLK__`-prefixed
    /// environment overrides (e.g. `PLCLK__CLOCK__OUTPUT_NAME=pl1`).
    pub fn new(config_path: String) -> PlclkResult<Self> {
        let builder = Config::builder()
            .add_source(File::with_name(config_path.as_str()).required(false))
            .add_source(
                config::Environment::with_prefix("PLCLK")
                    .separator("__")
                    .try_parsing(true),
            );
        let inner: Inner = builder.build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }

    #[cfg(test)]
    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self(Arc::new(inner))
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Inner {
    #[serde(default)]
    pub device: Device,
    #[serde(default)]
    pub clock: Clock,
    #[serde(default)]
    pub platform: Platform,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    /// Filesystem path of the control endpoint. Claimed at start-up,
    /// released at shutdown.
    #[serde(default = "Device::socket_path_default")]
    pub socket_path: PathBuf,
}

impl Device {
    fn socket_path_default() -> PathBuf {
        DEFAULT_SOCKET_PATH.into()
    }
}

impl Default for Device {
    fn default() -> Self {
        Device {
            socket_path: Device::socket_path_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Clock {
    /// Direct-lookup node name. When set it takes precedence over the
    /// provider/output pair below.
    #[serde(default)]
    pub node_name: Option<String>,
    /// Compatibility string identifying the provider node.
    #[serde(default = "Clock::provider_compatible_default")]
    pub provider_compatible: String,
    /// Output name scanned for in the provider's output-name list.
    #[serde(default = "Clock::output_name_default")]
    pub output_name: String,
    /// Rate applied immediately after bind. A provider rejection here fails
    /// bring-up.
    #[serde(default)]
    pub initial_rate: Option<u64>,
    /// Enable the clock immediately after bind.
    #[serde(default)]
    pub enable_on_bind: bool,
}

impl Clock {
    fn provider_compatible_default() -> String {
        DEFAULT_PROVIDER_COMPATIBLE.into()
    }

    fn output_name_default() -> String {
        DEFAULT_OUTPUT_NAME.into()
    }

    /// Resolution strategy selected by this configuration.
    pub fn locator(&self) -> ClockLocator {
        match &self.node_name {
            Some(name) => ClockLocator::Node { name: name.clone() },
            None => ClockLocator::Provider {
                compatible: self.provider_compatible.clone(),
                output: self.output_name.clone(),
            },
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock {
            node_name: None,
            provider_compatible: Clock::provider_compatible_default(),
            output_name: Clock::output_name_default(),
            initial_rate: None,
            enable_on_bind: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Platform {
    /// Platform configuration tree root, read once at bind time.
    #[serde(default = "Platform::tree_dir_default")]
    pub tree_dir: PathBuf,
    /// Clock provider control directory.
    #[serde(default = "Platform::provider_dir_default")]
    pub provider_dir: PathBuf,
}

impl Platform {
    fn tree_dir_default() -> PathBuf {
        DEFAULT_TREE_DIR.into()
    }

    fn provider_dir_default() -> PathBuf {
        DEFAULT_PROVIDER_DIR.into()
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform {
            tree_dir: Platform::tree_dir_default(),
            provider_dir: Platform::provider_dir_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    #[serde(default = "Log::level_default")]
    pub level: String,
    #[serde(default = "Log::dir_default")]
    pub dir: String,
}

impl Log {
    fn level_default() -> String {
        "info".into()
    }

    fn dir_default() -> String {
        "logs".into()
    }
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: Log::level_default(),
            dir: Log::dir_default(),
        }
    }
}
