// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare `DnsProvider` for cfddns.
//
// ## Scope
//
// Only the three calls the reconciliation cycle needs, all scoped to one
// pre-configured zone:
// - List the A-records for a hostname
// - Create an A-record
// - Overwrite an A-record's content
//
// Each trait call is exactly one HTTP request. Retries, comparison and
// scheduling belong to the engine.
//
// ## Authentication
//
// Either a scoped API token (`Authorization: Bearer`) or the legacy account
// email plus global API key (`X-Auth-Email` / `X-Auth-Key`). Credentials
// never appear in logs or in `Debug` output.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::ProviderConfig;
use cfddns_core::traits::{DnsProvider, DnsRecord};
use cfddns_core::{Error, Result};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// How to authenticate against the API
#[derive(Clone)]
pub enum Credentials {
    /// Scoped API token with Zone:DNS:Edit
    Token(String),
    /// Account email plus global API key
    GlobalKey { email: String, api_key: String },
}

impl Credentials {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Token(token) => request.bearer_auth(token),
            Credentials::GlobalKey { email, api_key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", api_key),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "api-token",
            Credentials::GlobalKey { .. } => "global-key",
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (record listing)
/// - Log the intended POST/PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    credentials: Credentials,

    /// Zone holding every managed record
    zone_id: String,

    /// API root, overridable for tests
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Envelope of every Cloudflare API v4 response
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiRecord {
    id: String,
    name: String,
    #[serde(default)]
    content: String,
}

impl From<ApiRecord> for DnsRecord {
    fn from(record: ApiRecord) -> Self {
        DnsRecord::new(record.id, record.name, record.content)
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: API token or email + global key
    /// - `zone_id`: Zone holding the managed records
    /// - `dry_run`: If true, perform GET requests but skip mutations
    pub fn new(credentials: Credentials, zone_id: impl Into<String>, dry_run: bool) -> Result<Self> {
        let zone_id = zone_id.into();
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        let has_secret = match &credentials {
            Credentials::Token(token) => !token.is_empty(),
            Credentials::GlobalKey { email, api_key } => !email.is_empty() && !api_key.is_empty(),
        };
        if !has_secret {
            return Err(Error::config("Cloudflare credentials cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Ok(Self {
            credentials,
            zone_id,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from configuration
    pub fn from_config(config: &ProviderConfig, dry_run: bool) -> Result<Self> {
        config.validate()?;

        match config {
            ProviderConfig::Cloudflare {
                zone_id,
                api_token,
                email,
                api_key,
            } => {
                // a token wins when both auth modes are configured
                let credentials = match (api_token, email, api_key) {
                    (Some(token), _, _) if !token.is_empty() => Credentials::Token(token.clone()),
                    (_, Some(email), Some(api_key)) => Credentials::GlobalKey {
                        email: email.clone(),
                        api_key: api_key.clone(),
                    },
                    _ => return Err(Error::config("Cloudflare credentials are incomplete")),
                };
                Self::new(credentials, zone_id.clone(), dry_run)
            }
        }
    }

    /// Point the provider at a different API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    fn record_payload(hostname: &str, address: Ipv4Addr) -> serde_json::Value {
        serde_json::json!({
            "type": "A",
            "name": hostname,
            "content": address.to_string(),
        })
    }

    /// Send one request and unwrap the API envelope
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
        subject: &str,
    ) -> Result<T> {
        let response = self
            .credentials
            .apply(request)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("Cloudflare request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(status, &error_text, action, subject));
        }

        let envelope: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("Failed to parse response: {}", e))
        })?;

        if !envelope.success {
            return Err(Error::provider(
                "cloudflare",
                format!("{} {} rejected: {}", action, subject, describe(&envelope.errors)),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(
                "cloudflare",
                format!("{} {}: response has no result", action, subject),
            )
        })
    }
}

/// Map a non-success HTTP status to an error
fn status_error(status: StatusCode, body: &str, action: &str, subject: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid credentials or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{} {}: zone or record not found", action, subject)),
        409 => Error::provider(
            "cloudflare",
            format!("Conflict while trying to {} {}. Status: {}", action, subject, status),
        ),
        429 => Error::rate_limited(format!("Rate limit exceeded. Status: {}", status)),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("Failed to {} {}: {} - {}", action, subject, status, body),
        ),
    }
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn fetch_records(&self, hostname: &str) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Fetching A record for host [{}]", hostname);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("type", "A"), ("name", hostname)]);
        let records: Vec<ApiRecord> = self.send(request, "fetch A records for", hostname).await?;

        Ok(records.into_iter().map(DnsRecord::from).collect())
    }

    async fn create_record(&self, hostname: &str, address: Ipv4Addr) -> Result<DnsRecord> {
        let payload = Self::record_payload(hostname, address);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.records_url(),
                payload
            );
            return Ok(DnsRecord::new(
                format!("dry-run-{}", hostname),
                hostname,
                address.to_string(),
            ));
        }

        tracing::debug!("Creating A record for host [{}]", hostname);
        let request = self.client.post(self.records_url()).json(&payload);
        let record: ApiRecord = self.send(request, "create A record for", hostname).await?;

        Ok(record.into())
    }

    async fn update_record(&self, record_id: &str, hostname: &str, address: Ipv4Addr) -> Result<()> {
        let url = format!("{}/{}", self.records_url(), record_id);
        let payload = Self::record_payload(hostname, address);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                payload
            );
            return Ok(());
        }

        tracing::debug!("Updating A record for host [{}]", hostname);
        let request = self.client.put(url).json(&payload);
        let _: ApiRecord = self.send(request, "update A record for", hostname).await?;

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
