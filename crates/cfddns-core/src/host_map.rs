// # Host Map
//
// In-memory view of the managed A-records, as last observed from the DNS
// provider.
//
// ## Ownership
//
// The map is owned exclusively by `DdnsEngine`. It is rebuilt wholesale on
// every successful refresh and patched synchronously after successful
// creates and updates, so there is never more than one writer.
//
// ## Keys
//
// DNS names are case-insensitive and providers usually hand them back in
// lowercase, so entries are keyed by the lowercased name without a trailing
// dot. Lookups normalize the same way.
//
// ## Crash Behavior
//
// Nothing is persisted. After a restart the first refresh rebuilds the map
// from the provider, which is the authoritative source anyway.

use crate::traits::DnsRecord;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Last observed state of one managed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    /// Provider ID of the record
    pub record_id: String,
    /// Record content as stored remotely (may not be a valid address)
    pub content: String,
    /// When this entry was last written
    pub observed_at: DateTime<Utc>,
}

impl HostRecord {
    /// Build an entry from a provider record
    pub fn from_record(record: &DnsRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            content: record.content.clone(),
            observed_at: Utc::now(),
        }
    }

    /// The content parsed as an IPv4 address, if it is one
    pub fn address(&self) -> Option<Ipv4Addr> {
        self.content.trim().parse().ok()
    }
}

/// Normalized map key for a hostname
pub fn host_key(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Hostname → last observed record
#[derive(Debug, Clone, Default)]
pub struct HostMap {
    inner: HashMap<String, HostRecord>,
}

impl HostMap {
    /// Create a new empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of hosts in the map
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the map is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Look up a hostname
    pub fn get(&self, hostname: &str) -> Option<&HostRecord> {
        self.inner.get(&host_key(hostname))
    }

    /// Check whether a hostname has an entry
    pub fn contains(&self, hostname: &str) -> bool {
        self.inner.contains_key(&host_key(hostname))
    }

    /// Insert or overwrite the entry for a hostname
    pub fn insert(&mut self, hostname: impl Into<String>, record: HostRecord) {
        let hostname: String = hostname.into();
        self.inner.insert(host_key(&hostname), record);
    }

    /// Insert or overwrite the entry for a record, keyed by its name
    pub fn insert_record(&mut self, record: &DnsRecord) {
        self.inner
            .insert(host_key(&record.name), HostRecord::from_record(record));
    }

    /// Merge a batch of fetched records; later records win on name clashes
    pub fn merge(&mut self, records: &[DnsRecord]) {
        for record in records {
            self.insert_record(record);
        }
    }

    /// Point an existing entry at a new address
    ///
    /// Returns the previous content, or `None` if the host has no entry.
    pub fn patch_content(&mut self, hostname: &str, address: Ipv4Addr) -> Option<String> {
        let entry = self.inner.get_mut(&host_key(hostname))?;
        let previous = std::mem::replace(&mut entry.content, address.to_string());
        entry.observed_at = Utc::now();
        Some(previous)
    }

    /// Replace the whole map with a freshly built one
    pub fn replace(&mut self, fresh: HostMap) {
        self.inner = fresh.inner;
    }

    /// Iterate over the normalized hostnames currently in the map (unordered)
    pub fn hostnames(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }
}
