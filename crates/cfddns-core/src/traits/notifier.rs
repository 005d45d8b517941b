// # Notifier Trait
//
// Defines the interface for announcing that a record was corrected.
//
// ## Implementations
//
// - IFTTT webhooks: `cfddns-notify-ifttt` crate

use async_trait::async_trait;
use serde::Serialize;
use std::net::Ipv4Addr;

/// A record that was pointed at a new address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// The corrected hostname
    pub hostname: String,
    /// Record content before the update, verbatim (may not be an address)
    pub previous: String,
    /// The address the record now points at
    pub current: Ipv4Addr,
}

impl Notification {
    /// Create a new notification
    pub fn new(hostname: impl Into<String>, previous: impl Into<String>, current: Ipv4Addr) -> Self {
        Self {
            hostname: hostname.into(),
            previous: previous.into(),
            current,
        }
    }
}

/// Trait for notification sinks
///
/// Notifications are fire-and-forget from the engine's point of view: the
/// engine runs them on tracked background tasks and only logs failures.
/// A notifier must never be relied upon for reconciliation correctness.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    async fn notify(&self, notification: &Notification) -> Result<(), crate::Error>;

    /// Get the notifier name (for logging/debugging)
    fn notifier_name(&self) -> &'static str;
}
