// # HTTP Address Resolver
//
// This crate provides the HTTP-based `AddressResolver` for cfddns.
//
// ## Purpose
//
// Every supported IP-lookup service works the same way: GET a URL, read the
// caller's IPv4 address out of the body. Services only differ in URL and in
// body shape, so one configurable resolver covers all of them:
// - **Text**: the body is the address, possibly wrapped in noise
// - **JSON**: the address is a string field at a dotted path
//
// ## Catalogue
//
// The `catalogue` module lists the built-in services. Anything else can be
// declared in the configuration file with the same fields.

pub mod catalogue;

use cfddns_core::traits::{AddressResolver, ResolveError};
use cfddns_core::{Error, ResolverConfig, ResponseFormat, Result};

use std::net::Ipv4Addr;
use std::time::Duration;

use tracing::debug;

const USER_AGENT: &str = concat!("cfddns/", env!("CARGO_PKG_VERSION"));

/// A resolver backed by one HTTP endpoint
pub struct HttpResolver {
    /// Name used in logs and errors
    name: String,

    /// Endpoint to GET
    url: String,

    /// How to read the body
    format: ResponseFormat,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpResolver {
    /// Create a new HTTP resolver
    ///
    /// # Parameters
    ///
    /// - `config`: Endpoint, body format and TLS settings
    /// - `timeout`: Total timeout for one lookup
    pub fn new(config: &ResolverConfig, timeout: Duration) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| {
                Error::config(format!(
                    "Failed to build HTTP client for {}: {}",
                    config.name, e
                ))
            })?;

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            format: config.format.clone(),
            client,
        })
    }

    /// Build a boxed roster from a list of configurations, preserving order
    pub fn roster(
        configs: &[ResolverConfig],
        timeout: Duration,
    ) -> Result<Vec<Box<dyn AddressResolver>>> {
        configs
            .iter()
            .map(|config| Ok(Box::new(Self::new(config, timeout)?) as Box<dyn AddressResolver>))
            .collect()
    }

    async fn fetch_body(&self) -> std::result::Result<String, ResolveError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ResolveError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ResolveError::Body(format!("failed to read response: {}", e)))
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpResolver {
    async fn initialize(&self) -> Result<()> {
        reqwest::Url::parse(&self.url).map_err(|e| {
            Error::config(format!("Resolver {} has an invalid URL: {}", self.name, e))
        })?;
        debug!("Resolver [{}] will query {}", self.name, self.url);
        Ok(())
    }

    async fn resolve(&self) -> Result<Ipv4Addr> {
        let parsed = match self.fetch_body().await {
            Ok(body) => match &self.format {
                ResponseFormat::Text => parse_text_body(&body),
                ResponseFormat::Json { path } => parse_json_body(&body, path),
            },
            Err(e) => Err(e),
        };

        parsed.map_err(|e| Error::resolve(&self.name, e))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Read an address from a plain-text body
///
/// Everything except digits and dots is discarded first, so surrounding
/// whitespace, labels or HTML tags do not matter.
pub fn parse_text_body(body: &str) -> std::result::Result<Ipv4Addr, ResolveError> {
    let cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    cleaned
        .parse()
        .map_err(|_| ResolveError::InvalidAddress(cleaned))
}

/// Read an address from the string field at `path` in a JSON body
///
/// `path` is dot-separated; each segment names an object field.
pub fn parse_json_body(body: &str, path: &str) -> std::result::Result<Ipv4Addr, ResolveError> {
    let document: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ResolveError::Body(format!("invalid JSON: {}", e)))?;

    let mut value = &document;
    for segment in path.split('.') {
        value = value
            .get(segment)
            .ok_or_else(|| ResolveError::Body(format!("missing field '{}'", path)))?;
    }

    let raw = value
        .as_str()
        .ok_or_else(|| ResolveError::Body(format!("field '{}' is not a string", path)))?;

    raw.trim()
        .parse()
        .map_err(|_| ResolveError::InvalidAddress(raw.to_string()))
}
