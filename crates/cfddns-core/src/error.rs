//! Error types for cfddns
//!
//! This module defines all error types used throughout the crate.

use crate::traits::ResolveError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for cfddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciliation step an error occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Probing the external address
    Resolve,
    /// Fetching records to rebuild the host map
    Refresh,
    /// Creating a missing record
    Create,
    /// Correcting a stale record
    Update,
    /// Delivering a change notification
    Notify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Resolve => "resolve",
            Step::Refresh => "refresh",
            Step::Create => "create",
            Step::Update => "update",
            Step::Notify => "notify",
        };
        f.write_str(name)
    }
}

/// Core error type for cfddns
#[derive(Error, Debug)]
pub enum Error {
    /// An IP-lookup probe failed
    #[error("resolver {resolver} failed: {source}")]
    Resolve {
        /// Resolver name
        resolver: String,
        /// Failure classification
        #[source]
        source: ResolveError,
    },

    /// DNS provider-related errors
    #[error("DNS provider error: {0}")]
    DnsProvider(String),

    /// Notification delivery errors
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A capability call exceeded the request timeout
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Error wrapped with the reconciliation step and host it belongs to
    #[error("{step} failed for {host}: {source}")]
    Step {
        /// Step that failed
        step: Step,
        /// Hostname being processed (or the resolver name for the resolve step)
        host: String,
        /// Underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a resolver error
    pub fn resolve(resolver: impl Into<String>, source: ResolveError) -> Self {
        Self::Resolve {
            resolver: resolver.into(),
            source,
        }
    }

    /// Create a DNS provider error
    pub fn dns_provider(msg: impl Into<String>) -> Self {
        Self::DnsProvider(msg.into())
    }

    /// Create a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with the step and host it occurred for
    pub fn in_step(self, step: Step, host: impl Into<String>) -> Self {
        Self::Step {
            step,
            host: host.into(),
            source: Box::new(self),
        }
    }

    /// The step this error was wrapped with, if any
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}
