//! Test doubles and common utilities for reconciliation contract tests
//!
//! Every double is cheap to clone and shares its state through `Arc`, so a
//! test can hand one copy to the engine and keep another to inspect calls.

#![allow(dead_code)]

use async_trait::async_trait;
use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{AddressResolver, DnsProvider, DnsRecord, Notification, Notifier};
use cfddns_core::{DdnsConfig, ProviderConfig, ResolveError, ResolverConfig};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOME_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 7);
pub const NEW_IP: Ipv4Addr = Ipv4Addr::new(198, 51, 100, 8);
pub const STALE_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

/// What a scripted resolver does when asked
#[derive(Debug, Clone)]
pub enum Reply {
    /// Report this address
    Address(Ipv4Addr),
    /// Fail with an HTTP status
    Fail,
    /// Report this address after a delay
    Delay(Duration, Ipv4Addr),
    /// Never answer
    Hang,
}

/// A resolver whose answer the test controls
#[derive(Clone)]
pub struct ScriptedResolver {
    name: String,
    reply: Arc<Mutex<Reply>>,
    calls: Arc<AtomicUsize>,
    fail_initialize: bool,
}

impl ScriptedResolver {
    pub fn new(name: &str, reply: Reply) -> Self {
        Self {
            name: name.to_string(),
            reply: Arc::new(Mutex::new(reply)),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_initialize: false,
        }
    }

    pub fn reporting(name: &str, address: Ipv4Addr) -> Self {
        Self::new(name, Reply::Address(address))
    }

    /// Make `initialize()` fail
    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Change the answer for subsequent calls
    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap() = reply;
    }

    /// Number of times resolve() was called
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn boxed(&self) -> Box<dyn AddressResolver> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl AddressResolver for ScriptedResolver {
    async fn initialize(&self) -> Result<()> {
        if self.fail_initialize {
            return Err(Error::resolve(&self.name, ResolveError::Network("unreachable".into())));
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            Reply::Address(address) => Ok(address),
            Reply::Fail => Err(Error::resolve(&self.name, ResolveError::Status(503))),
            Reply::Delay(after, address) => {
                tokio::time::sleep(after).await;
                Ok(address)
            }
            Reply::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Default)]
struct Zone {
    records: Vec<DnsRecord>,
    next_id: usize,
    lowercase_names: bool,
    fail_fetch: HashSet<String>,
    fail_create: HashSet<String>,
    fail_update: HashSet<String>,
    fetch_calls: Vec<String>,
    create_calls: Vec<(String, Ipv4Addr)>,
    update_calls: Vec<(String, String, Ipv4Addr)>,
}

/// An in-memory DNS zone with failure injection
#[derive(Clone, Default)]
pub struct MockDnsProvider {
    zone: Arc<Mutex<Zone>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store names in lowercase and match them case-insensitively, the way
    /// real DNS providers do
    pub fn lowercasing_names(self) -> Self {
        self.zone.lock().unwrap().lowercase_names = true;
        self
    }

    /// Seed an A record
    pub fn with_record(self, hostname: &str, content: &str) -> Self {
        {
            let mut zone = self.zone.lock().unwrap();
            zone.next_id += 1;
            let id = format!("rec-{}", zone.next_id);
            zone.records.push(DnsRecord::new(id, hostname, content));
        }
        self
    }

    pub fn fail_fetch_for(&self, hostname: &str) {
        self.zone.lock().unwrap().fail_fetch.insert(hostname.to_string());
    }

    pub fn fail_create_for(&self, hostname: &str) {
        self.zone.lock().unwrap().fail_create.insert(hostname.to_string());
    }

    pub fn fail_update_for(&self, hostname: &str) {
        self.zone.lock().unwrap().fail_update.insert(hostname.to_string());
    }

    pub fn heal(&self) {
        let mut zone = self.zone.lock().unwrap();
        zone.fail_fetch.clear();
        zone.fail_create.clear();
        zone.fail_update.clear();
    }

    /// Overwrite a record's content behind the engine's back
    pub fn tamper(&self, hostname: &str, content: &str) {
        let mut zone = self.zone.lock().unwrap();
        for record in zone.records.iter_mut().filter(|r| r.name == hostname) {
            record.content = content.to_string();
        }
    }

    pub fn content_of(&self, hostname: &str) -> Option<String> {
        let zone = self.zone.lock().unwrap();
        zone.records
            .iter()
            .find(|r| r.name == hostname)
            .map(|r| r.content.clone())
    }

    pub fn record_id_of(&self, hostname: &str) -> Option<String> {
        let zone = self.zone.lock().unwrap();
        zone.records
            .iter()
            .find(|r| r.name == hostname)
            .map(|r| r.id.clone())
    }

    pub fn fetch_calls(&self) -> Vec<String> {
        self.zone.lock().unwrap().fetch_calls.clone()
    }

    pub fn create_calls(&self) -> Vec<(String, Ipv4Addr)> {
        self.zone.lock().unwrap().create_calls.clone()
    }

    pub fn update_calls(&self) -> Vec<(String, String, Ipv4Addr)> {
        self.zone.lock().unwrap().update_calls.clone()
    }

    pub fn write_count(&self) -> usize {
        let zone = self.zone.lock().unwrap();
        zone.create_calls.len() + zone.update_calls.len()
    }

    pub fn boxed(&self) -> Box<dyn DnsProvider> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn fetch_records(&self, hostname: &str) -> Result<Vec<DnsRecord>> {
        let mut zone = self.zone.lock().unwrap();
        zone.fetch_calls.push(hostname.to_string());
        if zone.fail_fetch.contains(hostname) {
            return Err(Error::dns_provider("injected fetch failure"));
        }
        let ignore_case = zone.lowercase_names;
        Ok(zone
            .records
            .iter()
            .filter(|r| {
                if ignore_case {
                    r.name.eq_ignore_ascii_case(hostname)
                } else {
                    r.name == hostname
                }
            })
            .cloned()
            .collect())
    }

    async fn create_record(&self, hostname: &str, address: Ipv4Addr) -> Result<DnsRecord> {
        let mut zone = self.zone.lock().unwrap();
        zone.create_calls.push((hostname.to_string(), address));
        if zone.fail_create.contains(hostname) {
            return Err(Error::dns_provider("injected create failure"));
        }
        zone.next_id += 1;
        let name = if zone.lowercase_names {
            hostname.to_ascii_lowercase()
        } else {
            hostname.to_string()
        };
        let record = DnsRecord::new(format!("rec-{}", zone.next_id), name, address.to_string());
        zone.records.push(record.clone());
        Ok(record)
    }

    async fn update_record(&self, record_id: &str, hostname: &str, address: Ipv4Addr) -> Result<()> {
        let mut zone = self.zone.lock().unwrap();
        zone.update_calls
            .push((record_id.to_string(), hostname.to_string(), address));
        if zone.fail_update.contains(hostname) {
            return Err(Error::dns_provider("injected update failure"));
        }
        match zone.records.iter_mut().find(|r| r.id == record_id) {
            Some(record) => {
                record.content = address.to_string();
                Ok(())
            }
            None => Err(Error::not_found(format!("record {}", record_id))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A notifier that records what it was asked to send
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        if self.failing {
            return Err(Error::notifier("injected notification failure"));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "recording"
    }
}

/// Create a minimal valid configuration for the given hostnames
pub fn minimal_config(hostnames: &[&str]) -> DdnsConfig {
    let mut config = DdnsConfig::new(ProviderConfig::Cloudflare {
        zone_id: "test-zone".to_string(),
        api_token: Some("test-token".to_string()),
        email: None,
        api_key: None,
    });
    config.hostnames = hostnames.iter().map(|h| h.to_string()).collect();
    config.resolvers = vec![ResolverConfig::text("scripted", "http://resolver.test")];
    config.engine.request_timeout_secs = 2;
    config.engine.shutdown_grace_secs = 1;
    config
}
