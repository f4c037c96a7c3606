use async_trait::async_trait;
use plclk_gateway_core::{ClockOutput, ClockProvider};
use plclk_gateway_error::{bind::BindError, clock::ClockError, ClockResult};
use plclk_gateway_models::{ClockId, Settings};
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Once,
    },
};
use tracing::Level;

static INIT_TRACING: Once = Once::new();

pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_target(false)
            .without_time()
            .try_init();
    });
}

/// Per-output behavior knobs for the in-memory provider.
#[derive(Debug, Clone)]
pub struct MockOutputSpec {
    pub initial_rate: u64,
    /// Rates are rounded down to a multiple of this (1 = exact).
    pub quantum: u64,
    /// Rates below this are rejected outright.
    pub min_rate: u64,
    pub fail_enable: bool,
    pub parents: Vec<String>,
}

impl Default for MockOutputSpec {
    fn default() -> Self {
        MockOutputSpec {
            initial_rate: 100_000_000,
            quantum: 1,
            min_rate: 1,
            fail_enable: false,
            parents: Vec::new(),
        }
    }
}

/// Observable state of one mock output, shared with the test body.
#[derive(Debug, Default)]
pub struct MockOutputProbe {
    pub enable_calls: AtomicU64,
    pub disable_calls: AtomicU64,
    pub relinquished: AtomicBool,
}

pub struct MockProvider {
    outputs: HashMap<String, (MockOutputSpec, Arc<MockOutputProbe>)>,
}

impl MockProvider {
    pub fn new() -> Self {
        MockProvider {
            outputs: HashMap::new(),
        }
    }

    pub fn with_output(mut self, name: &str, spec: MockOutputSpec) -> Self {
        self.outputs
            .insert(name.to_string(), (spec, Arc::new(MockOutputProbe::default())));
        self
    }

    pub fn probe(&self, name: &str) -> Arc<MockOutputProbe> {
        self.outputs[name].1.clone()
    }
}

#[async_trait]
impl ClockProvider for MockProvider {
    async fn request(&self, id: &ClockId) -> Result<Box<dyn ClockOutput>, BindError> {
        let (spec, probe) = self
            .outputs
            .get(&id.output)
            .ok_or(BindError::ProviderRejected(-2))?;
        Ok(Box::new(MockOutput {
            name: id.output.clone(),
            // The rate is stored in halves with a yield between the writes,
            // so an unserialized concurrent setter would tear it.
            rate_hi: AtomicU64::new(spec.initial_rate >> 32),
            rate_lo: AtomicU64::new(spec.initial_rate & 0xffff_ffff),
            spec: spec.clone(),
            probe: probe.clone(),
        }))
    }
}

pub struct MockOutput {
    name: String,
    rate_hi: AtomicU64,
    rate_lo: AtomicU64,
    spec: MockOutputSpec,
    probe: Arc<MockOutputProbe>,
}

impl Drop for MockOutput {
    fn drop(&mut self) {
        self.probe.relinquished.store(true, Ordering::Release);
    }
}

#[async_trait]
impl ClockOutput for MockOutput {
    fn name(&self) -> &str {
        &self.name
    }

    async fn rate(&self) -> u64 {
        (self.rate_hi.load(Ordering::Acquire) << 32) | self.rate_lo.load(Ordering::Acquire)
    }

    async fn set_rate(&self, rate: u64) -> ClockResult<u64> {
        if rate < self.spec.min_rate {
            return Err(ClockError::RateRejected { rate, code: -22 });
        }
        let achieved = rate - rate % self.spec.quantum;
        self.rate_hi.store(achieved >> 32, Ordering::Release);
        tokio::task::yield_now().await;
        self.rate_lo.store(achieved & 0xffff_ffff, Ordering::Release);
        Ok(achieved)
    }

    async fn enable(&self) -> ClockResult<()> {
        self.probe.enable_calls.fetch_add(1, Ordering::AcqRel);
        if self.spec.fail_enable {
            return Err(ClockError::EnableRefused { code: -16 });
        }
        Ok(())
    }

    async fn disable(&self) {
        self.probe.disable_calls.fetch_add(1, Ordering::AcqRel);
    }

    async fn parents(&self) -> Vec<String> {
        self.spec.parents.clone()
    }
}

/// Write a flattened platform-tree directory with one provider node
/// exporting the given outputs.
pub fn write_provider_tree(root: &Path, compatible: &str, outputs: &[&str]) {
    let node = root.join("clkc");
    std::fs::create_dir_all(&node).unwrap();
    let mut compat = compatible.as_bytes().to_vec();
    compat.push(0);
    std::fs::write(node.join("compatible"), compat).unwrap();
    let mut names = Vec::new();
    for output in outputs {
        names.extend_from_slice(output.as_bytes());
        names.push(0);
    }
    std::fs::write(node.join("clock-output-names"), names).unwrap();
}

/// Build settings from a TOML body written into `dir`.
pub fn settings_from(dir: &Path, toml: &str) -> Settings {
    let path = dir.join("plclk-gateway.toml");
    std::fs::write(&path, toml).unwrap();
    Settings::new(path.to_string_lossy().into_owned()).unwrap()
}
