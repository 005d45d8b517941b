// # DNS Provider Trait
//
// Defines the interface for reading and writing A-records in a managed zone.
//
// ## Implementations
//
// - Cloudflare: `cfddns-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> cfddns_core::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.fetch_records("home.example.com").await?;
//     for record in records {
//         provider
//             .update_record(&record.id, &record.name, [203, 0, 113, 7].into())
//             .await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// An A-record as stored by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// The fully qualified record name
    pub name: String,
    /// The record content as stored remotely
    ///
    /// Kept as a string: a zone can hold content that is not a valid
    /// address, and the engine must be able to see and correct it.
    pub content: String,
}

impl DnsRecord {
    /// Create a new record value
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers are isolated and single-shot: each method performs the API
/// call(s) needed for that one operation and reports success or failure.
///
/// ## Forbidden Capabilities
/// - Retrying or backing off (the next scheduled cycle is the retry)
/// - Deciding whether an update is needed (owned by `DdnsEngine`)
/// - Caching records between calls (the engine's host map owns that)
/// - Spawning tasks
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch all A-records for a hostname
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<DnsRecord>)`: Zero or more records (empty when none exist)
    /// - `Err(Error)`: If the request failed
    async fn fetch_records(&self, hostname: &str) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Create an A-record pointing `hostname` at `address`
    ///
    /// # Returns
    ///
    /// The record as created by the provider, including its new ID.
    async fn create_record(
        &self,
        hostname: &str,
        address: Ipv4Addr,
    ) -> Result<DnsRecord, crate::Error>;

    /// Point an existing A-record at `address`
    ///
    /// # Parameters
    ///
    /// - `record_id`: Provider ID of the record to overwrite
    /// - `hostname`: The record name (some APIs require it on update)
    /// - `address`: The new content
    async fn update_record(
        &self,
        record_id: &str,
        hostname: &str,
        address: Ipv4Addr,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
