//! Core traits for cfddns
//!
//! This module defines the capability interfaces the engine orchestrates.
//!
//! - [`AddressResolver`]: Probe an external service for the public IPv4 address
//! - [`DnsProvider`]: Fetch, create and update A-records
//! - [`Notifier`]: Deliver change notifications

pub mod dns_provider;
pub mod notifier;
pub mod resolver;

pub use dns_provider::{DnsProvider, DnsRecord};
pub use notifier::{Notification, Notifier};
pub use resolver::{AddressResolver, ResolveError};
