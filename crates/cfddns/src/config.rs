//! Daemon configuration
//!
//! Builds a [`DdnsConfig`] from an optional JSON file plus `CFDDNS_*`
//! environment variables. Environment values always win over file values.

use anyhow::{Context, Result};
use cfddns_core::{DdnsConfig, NotifierConfig, ProviderConfig};
use cfddns_resolver_http::catalogue;
use std::env;

/// Everything the daemon needs to start
pub struct Config {
    /// Engine, provider, resolver and notifier settings
    pub ddns: DdnsConfig,
    /// Log level name (trace, debug, info, warn, error)
    pub log_level: String,
    /// Skip DNS mutations, only log them
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // blank values count as unset
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let from_file = var("CFDDNS_CONFIG").is_some();
        let mut ddns = match var("CFDDNS_CONFIG") {
            Some(path) => DdnsConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load CFDDNS_CONFIG file {}", path))?,
            None => DdnsConfig::new(ProviderConfig::Cloudflare {
                zone_id: String::new(),
                api_token: None,
                email: None,
                api_key: None,
            }),
        };

        let ProviderConfig::Cloudflare {
            zone_id,
            api_token,
            email,
            api_key,
        } = &mut ddns.provider;
        if let Some(value) = var("CFDDNS_CLOUDFLARE_ZONE_ID") {
            *zone_id = value;
        }
        if let Some(value) = var("CFDDNS_CLOUDFLARE_API_TOKEN") {
            *api_token = Some(value);
        }
        if let Some(value) = var("CFDDNS_CLOUDFLARE_EMAIL") {
            *email = Some(value);
        }
        if let Some(value) = var("CFDDNS_CLOUDFLARE_API_KEY") {
            *api_key = Some(value);
        }

        if let Some(hostnames) = var("CFDDNS_HOSTNAMES") {
            ddns.hostnames = split_list(&hostnames);
        }

        if let Some(names) = var("CFDDNS_RESOLVERS") {
            ddns.resolvers = catalogue::select(&split_list(&names))?;
        } else if ddns.resolvers.is_empty() {
            ddns.resolvers = catalogue::all();
        }

        if let Some(raw) = var("CFDDNS_RESOLVER_NO_VERIFY")
            && parse_flag("CFDDNS_RESOLVER_NO_VERIFY", &raw)?
        {
            for resolver in &mut ddns.resolvers {
                resolver.accept_invalid_certs = true;
            }
        }

        if let Some(interval) = var("CFDDNS_CHECK_INTERVAL") {
            ddns.check_interval = interval;
        }

        match (var("CFDDNS_IFTTT_MAKER_KEY"), var("CFDDNS_IFTTT_EVENT")) {
            (Some(maker_key), Some(event_name)) => {
                ddns.notifier = NotifierConfig::Ifttt {
                    maker_key,
                    event_name,
                };
            }
            (None, None) => {}
            _ => anyhow::bail!(
                "CFDDNS_IFTTT_MAKER_KEY and CFDDNS_IFTTT_EVENT must be set together"
            ),
        }

        if let Some(raw) = var("CFDDNS_REQUEST_TIMEOUT_SECS") {
            ddns.engine.request_timeout_secs = raw.parse().with_context(|| {
                format!("CFDDNS_REQUEST_TIMEOUT_SECS must be a number of seconds. Got: {}", raw)
            })?;
        }

        let dry_run = match var("CFDDNS_MODE").map(|m| m.to_lowercase()).as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "CFDDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        if !from_file && ddns.hostnames.is_empty() {
            anyhow::bail!(
                "CFDDNS_HOSTNAMES must contain at least one hostname. \
                Set it via: export CFDDNS_HOSTNAMES=home.example.com,vpn.example.com"
            );
        }

        Ok(Self {
            ddns,
            log_level: var("CFDDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            dry_run,
        })
    }

    /// Validate the configuration
    ///
    /// On top of the core checks this catches malformed hostnames, placeholder
    /// credentials and unknown log levels before anything touches the network.
    pub fn validate(&self) -> Result<()> {
        self.ddns.validate()?;

        for hostname in &self.ddns.hostnames {
            validate_domain_name(hostname)?;
        }

        let ProviderConfig::Cloudflare { api_token, .. } = &self.ddns.provider;
        if let Some(token) = api_token {
            let token_lower = token.to_lowercase();
            if token_lower.contains("your_token")
                || token_lower.contains("replace_me")
                || token_lower == "token"
            {
                anyhow::bail!(
                    "CFDDNS_CLOUDFLARE_API_TOKEN appears to be a placeholder. \
                    Use an actual API token from the Cloudflare dashboard."
                );
            }
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CFDDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", key, raw),
    }
}

/// Validate that a string is a valid domain name (RFC 1035)
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}
