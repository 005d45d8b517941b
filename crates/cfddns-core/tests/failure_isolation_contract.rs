//! Contract Test: Cycle Abort & Failure Isolation
//!
//! Constraints verified:
//! - A resolver failure abandons the cycle before the provider is touched
//! - A fetch failure abandons the cycle and keeps the previous host map
//! - A hanging capability is cut off by the request timeout
//! - Errors carry the step and the host or resolver they happened for

mod common;

use cfddns_core::{DdnsEngine, EngineEvent, Error, Step};
use common::*;
use std::time::Duration;

#[tokio::test]
async fn resolve_failure_skips_provider_entirely() {
    let resolver = ScriptedResolver::new("down", Reply::Fail);
    let provider = MockDnsProvider::new();

    let (mut engine, mut rx) = DdnsEngine::new(
        vec![resolver.boxed()],
        provider.boxed(),
        None,
        &minimal_config(&["home.example.com"]),
    )
    .unwrap();

    let err = engine.run_cycle().await.expect_err("cycle is abandoned");

    assert_eq!(err.step(), Some(Step::Resolve));
    assert!(err.to_string().starts_with("resolve failed for down"));
    assert!(provider.fetch_calls().is_empty());
    assert_eq!(provider.write_count(), 0);
    assert!(engine.host_map().is_empty());

    assert!(matches!(
        rx.try_recv(),
        Ok(EngineEvent::ResolveFailed { resolver, .. }) if resolver == "down"
    ));
}

#[tokio::test]
async fn fetch_failure_keeps_previous_map_and_writes_nothing() {
    let resolver = ScriptedResolver::reporting("r", HOME_IP);
    let provider = MockDnsProvider::new()
        .with_record("a.example.com", "198.51.100.7")
        .with_record("b.example.com", "198.51.100.7");

    let (mut engine, _rx) = DdnsEngine::new(
        vec![resolver.boxed()],
        provider.boxed(),
        None,
        &minimal_config(&["a.example.com", "b.example.com"]),
    )
    .unwrap();

    engine.run_cycle().await.unwrap();
    assert_eq!(engine.host_map().len(), 2);

    // address moves, but the zone is unreadable for one host
    resolver.set_reply(Reply::Address(NEW_IP));
    provider.fail_fetch_for("b.example.com");

    let err = engine.run_cycle().await.expect_err("cycle is abandoned");
    assert_eq!(err.step(), Some(Step::Refresh));
    assert!(err.to_string().contains("b.example.com"));

    assert_eq!(provider.write_count(), 0);
    assert_eq!(engine.host_map().len(), 2);
    assert_eq!(
        engine.host_map().get("a.example.com").unwrap().address(),
        Some(HOME_IP)
    );

    provider.heal();
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.updated, 2);
}

#[tokio::test]
async fn missing_host_with_broken_fetch_is_not_created() {
    let resolver = ScriptedResolver::reporting("r", HOME_IP);
    let provider = MockDnsProvider::new();
    provider.fail_fetch_for("home.example.com");

    let (mut engine, _rx) = DdnsEngine::new(
        vec![resolver.boxed()],
        provider.boxed(),
        None,
        &minimal_config(&["home.example.com"]),
    )
    .unwrap();

    assert!(engine.run_cycle().await.is_err());
    assert!(provider.create_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn hanging_resolver_times_out() {
    let hung = ScriptedResolver::new("hung", Reply::Hang);
    let next = ScriptedResolver::reporting("next", HOME_IP);
    let provider = MockDnsProvider::new();

    let (mut engine, _rx) = DdnsEngine::new(
        vec![hung.boxed(), next.boxed()],
        provider.boxed(),
        None,
        &minimal_config(&["home.example.com"]),
    )
    .unwrap();

    let started = tokio::time::Instant::now();
    let err = engine.run_cycle().await.expect_err("timed out");
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(2) && waited < Duration::from_secs(3));

    assert_eq!(err.step(), Some(Step::Resolve));
    match err {
        Error::Step { source, .. } => assert!(matches!(*source, Error::Timeout { .. })),
        other => panic!("unexpected error: {other:?}"),
    }

    // rotation moved on
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.resolver, "next");
    assert_eq!(report.created, 1);
}

#[tokio::test]
async fn engine_rejects_invalid_settings() {
    let resolver = ScriptedResolver::reporting("r", HOME_IP);

    let mut config = minimal_config(&["home.example.com"]);
    config.engine.request_timeout_secs = 0;
    let result = DdnsEngine::new(
        vec![resolver.boxed()],
        MockDnsProvider::new().boxed(),
        None,
        &config,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
