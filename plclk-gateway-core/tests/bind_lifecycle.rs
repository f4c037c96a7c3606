mod common;

use common::{init_tracing, MockOutputSpec, MockProvider};
use plclk_gateway_core::{BindOptions, ClockBinding};
use plclk_gateway_error::{bind::BindError, clock::ClockError};
use plclk_gateway_models::{ClockLocator, PlatformNode, PlatformTree};
use std::sync::{atomic::Ordering, Arc};

fn provider_tree(outputs: &[&str]) -> PlatformTree {
    PlatformTree::new(vec![PlatformNode::new("clkc")
        .with_strings("compatible", &["xlnx,zynqmp-clkc"])
        .with_strings("clock-output-names", outputs)])
}

fn pl0_locator() -> ClockLocator {
    ClockLocator::Provider {
        compatible: "xlnx,zynqmp-clkc".into(),
        output: "pl0".into(),
    }
}

#[tokio::test]
async fn bind_applies_initial_rate_and_enable() {
    init_tracing();
    let provider = MockProvider::new().with_output(
        "pl0",
        MockOutputSpec {
            parents: vec!["iopll".into(), "ps_ref_clk".into()],
            ..MockOutputSpec::default()
        },
    );
    let probe = provider.probe("pl0");
    let tree = provider_tree(&["a", "b", "pl0"]);

    let binding = ClockBinding::bind(
        &tree,
        &provider,
        &pl0_locator(),
        BindOptions {
            initial_rate: Some(20_000_000),
            enable_on_bind: true,
        },
    )
    .await
    .unwrap();

    assert_eq!(binding.id().index, 2);
    assert_eq!(binding.get_rate().await, 20_000_000);
    assert!(binding.is_enabled().await);
    assert_eq!(probe.enable_calls.load(Ordering::Acquire), 1);
    assert_eq!(binding.parents().await, vec!["iopll", "ps_ref_clk"]);
}

#[tokio::test]
async fn set_rate_reports_provider_quantization() {
    init_tracing();
    let provider = MockProvider::new().with_output(
        "pl0",
        MockOutputSpec {
            quantum: 1000,
            ..MockOutputSpec::default()
        },
    );
    let tree = provider_tree(&["pl0"]);

    let binding = ClockBinding::bind(&tree, &provider, &pl0_locator(), BindOptions::default())
        .await
        .unwrap();

    let achieved = binding.set_rate(1_234_567).await.unwrap();
    assert_eq!(achieved, 1_234_000);
    assert_eq!(binding.get_rate().await, achieved);
}

#[tokio::test]
async fn rejected_rate_propagates_and_leaves_rate_alone() {
    init_tracing();
    let provider = MockProvider::new().with_output(
        "pl0",
        MockOutputSpec {
            initial_rate: 50_000,
            min_rate: 10_000,
            ..MockOutputSpec::default()
        },
    );
    let tree = provider_tree(&["pl0"]);
    let binding = ClockBinding::bind(&tree, &provider, &pl0_locator(), BindOptions::default())
        .await
        .unwrap();

    let err = binding.set_rate(3).await.unwrap_err();
    assert!(matches!(err, ClockError::RateRejected { rate: 3, .. }));
    assert_eq!(binding.get_rate().await, 50_000);
}

#[tokio::test]
async fn failed_post_bind_enable_releases_the_clock() {
    init_tracing();
    let provider = MockProvider::new().with_output(
        "pl0",
        MockOutputSpec {
            fail_enable: true,
            ..MockOutputSpec::default()
        },
    );
    let probe = provider.probe("pl0");
    let tree = provider_tree(&["pl0"]);

    let err = ClockBinding::bind(
        &tree,
        &provider,
        &pl0_locator(),
        BindOptions {
            initial_rate: None,
            enable_on_bind: true,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err, BindError::ProviderRejected(-16));
    assert!(probe.relinquished.load(Ordering::Acquire));
}

#[tokio::test]
async fn rejected_initial_rate_releases_the_clock() {
    init_tracing();
    let provider = MockProvider::new().with_output(
        "pl0",
        MockOutputSpec {
            min_rate: 1_000_000,
            ..MockOutputSpec::default()
        },
    );
    let probe = provider.probe("pl0");
    let tree = provider_tree(&["pl0"]);

    let err = ClockBinding::bind(
        &tree,
        &provider,
        &pl0_locator(),
        BindOptions {
            initial_rate: Some(10),
            enable_on_bind: false,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err, BindError::ProviderRejected(-22));
    assert!(probe.relinquished.load(Ordering::Acquire));
}

#[tokio::test]
async fn disable_is_idempotent_even_when_never_enabled() {
    init_tracing();
    let provider = MockProvider::new().with_output("pl0", MockOutputSpec::default());
    let tree = provider_tree(&["pl0"]);
    let binding = ClockBinding::bind(&tree, &provider, &pl0_locator(), BindOptions::default())
        .await
        .unwrap();

    binding.set_enabled(false).await.unwrap();
    binding.set_enabled(false).await.unwrap();
    assert!(!binding.is_enabled().await);
}

#[tokio::test]
async fn release_disables_an_enabled_clock() {
    init_tracing();
    let provider = MockProvider::new().with_output("pl0", MockOutputSpec::default());
    let probe = provider.probe("pl0");
    let tree = provider_tree(&["pl0"]);
    let binding = ClockBinding::bind(&tree, &provider, &pl0_locator(), BindOptions::default())
        .await
        .unwrap();

    binding.set_enabled(true).await.unwrap();
    Arc::new(binding).release().await;

    assert_eq!(probe.disable_calls.load(Ordering::Acquire), 1);
    assert!(probe.relinquished.load(Ordering::Acquire));
}

#[tokio::test]
async fn release_without_enable_skips_disable() {
    init_tracing();
    let provider = MockProvider::new().with_output("pl0", MockOutputSpec::default());
    let probe = provider.probe("pl0");
    let tree = provider_tree(&["pl0"]);
    let binding = ClockBinding::bind(&tree, &provider, &pl0_locator(), BindOptions::default())
        .await
        .unwrap();

    Arc::new(binding).release().await;

    assert_eq!(probe.disable_calls.load(Ordering::Acquire), 0);
    assert!(probe.relinquished.load(Ordering::Acquire));
}

#[tokio::test]
async fn concurrent_rate_changes_never_tear() {
    init_tracing();
    let provider = MockProvider::new().with_output("pl0", MockOutputSpec::default());
    let tree = provider_tree(&["pl0"]);
    let binding = Arc::new(
        ClockBinding::bind(&tree, &provider, &pl0_locator(), BindOptions::default())
            .await
            .unwrap(),
    );

    // Values whose halves differ, so an unserialized interleaving would
    // surface as a rate that is neither.
    let a: u64 = (1 << 32) | 11;
    let b: u64 = (2 << 32) | 22;

    for _ in 0..50 {
        let ba = binding.clone();
        let bb = binding.clone();
        let ta = tokio::spawn(async move { ba.set_rate(a).await });
        let tb = tokio::spawn(async move { bb.set_rate(b).await });
        ta.await.unwrap().unwrap();
        tb.await.unwrap().unwrap();

        let rate = binding.get_rate().await;
        assert!(rate == a || rate == b, "torn rate {rate:#x}");
    }
}
