//! Contract Test: Resolver Rotation
//!
//! Constraints verified:
//! - Exactly one resolver is consulted per cycle
//! - Resolvers are used in roster order, wrapping around
//! - The cursor advances even when the chosen resolver fails
//! - The poll interval is derived from the roster length

mod common;

use cfddns_core::DdnsEngine;
use common::*;
use std::time::Duration;

fn roster(resolvers: &[&ScriptedResolver]) -> Vec<Box<dyn cfddns_core::AddressResolver>> {
    resolvers.iter().map(|r| r.boxed()).collect()
}

#[tokio::test]
async fn one_resolver_per_cycle_in_roster_order() {
    let a = ScriptedResolver::reporting("a", HOME_IP);
    let b = ScriptedResolver::reporting("b", HOME_IP);
    let c = ScriptedResolver::reporting("c", HOME_IP);
    let provider = MockDnsProvider::new().with_record("home.example.com", "198.51.100.7");

    let (mut engine, _rx) = DdnsEngine::new(
        roster(&[&a, &b, &c]),
        provider.boxed(),
        None,
        &minimal_config(&["home.example.com"]),
    )
    .expect("engine construction succeeds");

    let mut used = Vec::new();
    for _ in 0..7 {
        let report = engine.run_cycle().await.expect("cycle succeeds");
        used.push(report.resolver);
    }

    assert_eq!(used, vec!["a", "b", "c", "a", "b", "c", "a"]);
    assert_eq!((a.calls(), b.calls(), c.calls()), (3, 2, 2));
    assert_eq!(engine.cursor(), 1);
}

#[tokio::test]
async fn failing_resolver_still_advances_cursor() {
    let a = ScriptedResolver::new("a", Reply::Fail);
    let b = ScriptedResolver::reporting("b", HOME_IP);
    let provider = MockDnsProvider::new().with_record("home.example.com", "198.51.100.7");

    let (mut engine, _rx) = DdnsEngine::new(
        roster(&[&a, &b]),
        provider.boxed(),
        None,
        &minimal_config(&["home.example.com"]),
    )
    .unwrap();

    assert!(engine.run_cycle().await.is_err());
    assert_eq!(engine.cursor(), 1);

    let report = engine.run_cycle().await.expect("second resolver succeeds");
    assert_eq!(report.resolver, "b");
    assert_eq!(engine.cursor(), 0);

    assert!(engine.run_cycle().await.is_err());
    assert_eq!(a.calls(), 2);
    assert_eq!(b.calls(), 1);
}

#[tokio::test]
async fn single_resolver_is_used_every_cycle() {
    let only = ScriptedResolver::reporting("only", HOME_IP);
    let provider = MockDnsProvider::new();

    let (mut engine, _rx) = DdnsEngine::new(
        roster(&[&only]),
        provider.boxed(),
        None,
        &minimal_config(&["home.example.com"]),
    )
    .unwrap();

    for _ in 0..3 {
        engine.run_cycle().await.unwrap();
        assert_eq!(engine.cursor(), 0);
    }
    assert_eq!(only.calls(), 3);
    assert_eq!(engine.poll_interval(), Duration::from_secs(300));
}

#[test]
fn explicit_interval_respects_courtesy_window() {
    let resolvers: Vec<ScriptedResolver> = (0..10)
        .map(|i| ScriptedResolver::reporting(&format!("r{}", i), HOME_IP))
        .collect();
    let refs: Vec<&ScriptedResolver> = resolvers.iter().collect();

    let mut config = minimal_config(&["home.example.com"]);
    config.check_interval = "20".to_string();
    let (engine, _rx) =
        DdnsEngine::new(roster(&refs), MockDnsProvider::new().boxed(), None, &config).unwrap();
    assert_eq!(engine.poll_interval(), Duration::from_secs(30));

    config.check_interval = "40".to_string();
    let (engine, _rx) =
        DdnsEngine::new(roster(&refs), MockDnsProvider::new().boxed(), None, &config).unwrap();
    assert_eq!(engine.poll_interval(), Duration::from_secs(40));
}
