// # Address Resolver Trait
//
// Defines the interface for probing an external IP-lookup service.
//
// ## Implementations
//
// - HTTP (plain text or JSON field): `cfddns-resolver-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::AddressResolver;
//
// #[tokio::main]
// async fn main() -> cfddns_core::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     resolver.initialize().await?;
//     let address = resolver.resolve().await?;
//     println!("{} says we are {}", resolver.name(), address);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Why a single probe failed
///
/// Every resolver implementation normalizes its failures into these four
/// classes so the engine can log them uniformly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The request never produced a response (DNS, connect, TLS, timeout)
    #[error("request failed: {0}")]
    Network(String),

    /// The service answered with a non-success status
    #[error("provider responded with HTTP/{0}")]
    Status(u16),

    /// The body could not be read or did not have the expected shape
    #[error("unparsable response body: {0}")]
    Body(String),

    /// The extracted value is not an IPv4 address
    #[error("cannot parse IP: [{0}]")]
    InvalidAddress(String),
}

/// Trait for external IP-lookup probes
///
/// A resolver performs exactly one lookup per [`resolve`](Self::resolve)
/// call. It does not retry, cache, or decide which resolver runs next;
/// rotation across the roster is owned by `DdnsEngine`.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Prepare the resolver for use
    ///
    /// Called once per roster member before the first cycle. A failure here
    /// is a startup error.
    async fn initialize(&self) -> Result<(), crate::Error> {
        Ok(())
    }

    /// Resolve the caller's public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The address reported by the service
    /// - `Err(Error)`: An `Error::Resolve` describing the failure
    async fn resolve(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Short identifier used in logs and events (e.g. "icanhazip")
    fn name(&self) -> &str;
}
