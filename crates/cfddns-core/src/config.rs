//! Configuration types for cfddns
//!
//! This module defines all configuration structures used throughout the crate.
//! Loading from the environment is the daemon's job; this module only knows
//! how to deserialize, validate, and read a JSON file.

use crate::error::{Error, Result};
use crate::host_map::host_key;
use crate::interval::IntervalPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Main cfddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Resolver roster, in rotation order
    #[serde(default)]
    pub resolvers: Vec<ResolverConfig>,

    /// Hostnames whose A-records are managed, in processing order
    #[serde(default)]
    pub hostnames: Vec<String>,

    /// Poll interval policy: "auto" or a number of seconds
    #[serde(default = "default_check_interval")]
    pub check_interval: String,

    /// Optional change notifications
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl DdnsConfig {
    /// Create a configuration for a provider with everything else defaulted
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            resolvers: Vec::new(),
            hostnames: Vec::new(),
            check_interval: default_check_interval(),
            notifier: NotifierConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Read a configuration from a JSON file
    ///
    /// The result is not validated; call [`validate`](Self::validate) after
    /// applying any overrides.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// The parsed poll interval policy
    pub fn interval_policy(&self) -> IntervalPolicy {
        IntervalPolicy::parse(&self.check_interval)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.hostnames.is_empty() {
            return Err(Error::config("No hostnames configured"));
        }

        let mut seen = HashSet::new();
        for hostname in &self.hostnames {
            if hostname.trim().is_empty() {
                return Err(Error::config("Hostnames cannot be empty"));
            }
            if !seen.insert(host_key(hostname)) {
                return Err(Error::config(format!("Duplicate hostname: {}", hostname)));
            }
        }

        if self.resolvers.is_empty() {
            return Err(Error::config("At least one resolver is required"));
        }
        for resolver in &self.resolvers {
            resolver.validate()?;
        }

        self.provider.validate()?;
        self.notifier.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

fn default_check_interval() -> String {
    "auto".to_string()
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare API v4
    ///
    /// Authenticate either with a scoped API token, or with the account
    /// email plus the global API key.
    Cloudflare {
        /// Zone holding the managed records
        zone_id: String,
        /// Scoped API token (Zone:DNS:Edit)
        #[serde(default)]
        api_token: Option<String>,
        /// Account email for global API key auth
        #[serde(default)]
        email: Option<String>,
        /// Global API key
        #[serde(default)]
        api_key: Option<String>,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Cloudflare {
                zone_id,
                api_token,
                email,
                api_key,
            } => {
                if zone_id.is_empty() {
                    return Err(Error::config("Cloudflare zone ID cannot be empty"));
                }

                let has_token = api_token.as_ref().is_some_and(|t| !t.is_empty());
                let has_key = email.as_ref().is_some_and(|e| !e.is_empty())
                    && api_key.as_ref().is_some_and(|k| !k.is_empty());
                if !has_token && !has_key {
                    return Err(Error::config(
                        "Cloudflare requires an API token, or an email and global API key",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

/// One IP-lookup service in the roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Short identifier used in logs (e.g. "icanhazip")
    pub name: String,

    /// Endpoint to GET
    pub url: String,

    /// How to read the address from the response body
    #[serde(default)]
    pub format: ResponseFormat,

    /// Skip TLS certificate verification for this endpoint
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl ResolverConfig {
    /// Create a plain-text resolver configuration
    pub fn text(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            format: ResponseFormat::Text,
            accept_invalid_certs: false,
        }
    }

    /// Create a JSON resolver configuration reading the field at `path`
    pub fn json(name: impl Into<String>, url: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            format: ResponseFormat::Json { path: path.into() },
            accept_invalid_certs: false,
        }
    }

    /// Skip or enforce TLS certificate verification
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::config("Resolver name cannot be empty"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(Error::config(format!(
                "Resolver {} must use an HTTP or HTTPS URL. Got: {}",
                self.name, self.url
            )));
        }
        if let ResponseFormat::Json { path } = &self.format
            && path.is_empty()
        {
            return Err(Error::config(format!(
                "Resolver {} uses JSON format but has no path",
                self.name
            )));
        }
        Ok(())
    }
}

/// Response body parsing rule for a resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Body is the address, possibly surrounded by noise
    #[default]
    Text,
    /// Body is a JSON object; the address is the string at a dotted path
    Json {
        /// Dotted field path, e.g. "ip" or "data.client.ip"
        path: String,
    },
}

/// Notification configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifierConfig {
    /// No notifications
    #[default]
    Disabled,

    /// IFTTT Maker webhook
    Ifttt {
        /// Webhook key
        maker_key: String,
        /// Event name to trigger
        event_name: String,
    },
}

impl NotifierConfig {
    /// Whether notifications are enabled
    pub fn is_enabled(&self) -> bool {
        !matches!(self, NotifierConfig::Disabled)
    }

    /// Validate the notifier configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            NotifierConfig::Disabled => Ok(()),
            NotifierConfig::Ifttt {
                maker_key,
                event_name,
            } => {
                if maker_key.is_empty() || event_name.is_empty() {
                    return Err(Error::config(
                        "IFTTT notifier requires both a maker key and an event name",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the notifier type name
    pub fn type_name(&self) -> &'static str {
        match self {
            NotifierConfig::Disabled => "disabled",
            NotifierConfig::Ifttt { .. } => "ifttt",
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound for any single resolver or DNS provider call (in seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// How long shutdown waits for pending notifications (in seconds)
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl EngineConfig {
    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shutdown grace period as a duration
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::config("Request timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    fn cloudflare_token() -> ProviderConfig {
        ProviderConfig::Cloudflare {
            zone_id: "zone".to_string(),
            api_token: Some("token".to_string()),
            email: None,
            api_key: None,
        }
    }

    fn valid_config() -> DdnsConfig {
        let mut config = DdnsConfig::new(cloudflare_token());
        config.hostnames = vec!["home.example.com".to_string()];
        config.resolvers = vec![ResolverConfig::text("icanhazip", "http://icanhazip.com")];
        config
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let config: DdnsConfig = serde_json::from_str(
            r#"{
                "provider": { "type": "cloudflare", "zone_id": "z", "api_token": "t" },
                "hostnames": ["home.example.com"],
                "resolvers": [
                    { "name": "icanhazip", "url": "http://icanhazip.com" },
                    { "name": "myip", "url": "https://api.myip.com",
                      "format": { "type": "json", "path": "ip" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.check_interval, "auto");
        assert_eq!(config.interval_policy(), IntervalPolicy::Auto);
        assert!(!config.notifier.is_enabled());
        assert_eq!(config.engine.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.resolvers[0].format, ResponseFormat::Text);
        assert_eq!(
            config.resolvers[1].format,
            ResponseFormat::Json { path: "ip".to_string() }
        );
        assert_ok!(config.validate());
    }

    #[test]
    fn explicit_interval_is_parsed() {
        let mut config = valid_config();
        config.check_interval = "45".to_string();
        assert_eq!(config.interval_policy(), IntervalPolicy::Explicit(45));
    }

    #[test]
    fn validation_rejects_missing_pieces() {
        let mut config = valid_config();
        config.hostnames.clear();
        assert_err!(config.validate());

        let mut config = valid_config();
        config.resolvers.clear();
        assert_err!(config.validate());

        let mut config = valid_config();
        config.hostnames.push("home.example.com".to_string());
        assert_err!(config.validate());

        let mut config = valid_config();
        config.hostnames.push("HOME.Example.com.".to_string());
        assert_err!(config.validate());

        let mut config = valid_config();
        config.resolvers.push(ResolverConfig::json("broken", "https://x.test", ""));
        assert_err!(config.validate());

        let mut config = valid_config();
        config.resolvers.push(ResolverConfig::text("ftp", "ftp://x.test"));
        assert_err!(config.validate());

        let mut config = valid_config();
        config.engine.event_channel_capacity = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn cloudflare_accepts_either_auth_mode() {
        let global_key = ProviderConfig::Cloudflare {
            zone_id: "zone".to_string(),
            api_token: None,
            email: Some("ops@example.com".to_string()),
            api_key: Some("key".to_string()),
        };
        assert_ok!(global_key.validate());
        assert_ok!(cloudflare_token().validate());

        let half_key = ProviderConfig::Cloudflare {
            zone_id: "zone".to_string(),
            api_token: Some(String::new()),
            email: Some("ops@example.com".to_string()),
            api_key: None,
        };
        assert_err!(half_key.validate());
    }

    #[test]
    fn ifttt_requires_key_and_event() {
        let notifier = NotifierConfig::Ifttt {
            maker_key: "key".to_string(),
            event_name: String::new(),
        };
        assert!(notifier.is_enabled());
        assert_err!(notifier.validate());
    }

    #[test]
    fn loads_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "provider": {{ "type": "cloudflare", "zone_id": "z", "api_token": "t" }},
                "hostnames": ["a.example.com", "b.example.com"],
                "resolvers": [{{ "name": "ipify", "url": "https://api.ipify.org" }}],
                "check_interval": "120",
                "notifier": {{ "type": "ifttt", "maker_key": "k", "event_name": "ip_changed" }}
            }}"#
        )
        .unwrap();

        let config = DdnsConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.hostnames.len(), 2);
        assert_eq!(config.interval_policy(), IntervalPolicy::Explicit(120));
        assert_eq!(config.notifier.type_name(), "ifttt");
        assert_ok!(config.validate());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = DdnsConfig::from_json_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
