// # IFTTT Notifier
//
// Announces record changes through an IFTTT Maker webhook:
//
// ```http
// POST https://maker.ifttt.com/trigger/:event/with/key/:key
// {"value1": "<hostname>", "value2": "<previous content>", "value3": "<new address>"}
// ```
//
// Only HTTP 200 counts as delivered. The maker key is part of the URL, so
// URLs are never logged.

use async_trait::async_trait;
use cfddns_core::config::NotifierConfig;
use cfddns_core::traits::{Notification, Notifier};
use cfddns_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// IFTTT Maker webhook root
const IFTTT_MAKER_BASE: &str = "https://maker.ifttt.com";

/// Default HTTP timeout for webhook calls
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook body: IFTTT only forwards these three fields
#[derive(Debug, Serialize, PartialEq, Eq)]
struct WebhookPayload<'a> {
    value1: &'a str,
    value2: &'a str,
    value3: String,
}

impl<'a> From<&'a Notification> for WebhookPayload<'a> {
    fn from(notification: &'a Notification) -> Self {
        Self {
            value1: &notification.hostname,
            value2: &notification.previous,
            value3: notification.current.to_string(),
        }
    }
}

/// IFTTT webhook notifier
pub struct IftttNotifier {
    /// ⚠️ NEVER log this value
    maker_key: String,
    event_name: String,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for IftttNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IftttNotifier")
            .field("maker_key", &"<REDACTED>")
            .field("event_name", &self.event_name)
            .finish()
    }
}

impl IftttNotifier {
    pub fn new(maker_key: impl Into<String>, event_name: impl Into<String>) -> Result<Self> {
        let maker_key = maker_key.into();
        let event_name = event_name.into();
        if maker_key.is_empty() || event_name.is_empty() {
            return Err(Error::config(
                "IFTTT notifier requires both a maker key and an event name",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            maker_key,
            event_name,
            base_url: IFTTT_MAKER_BASE.to_string(),
            client,
        })
    }

    /// Build a notifier from configuration; `None` when notifications are disabled
    pub fn from_config(config: &NotifierConfig) -> Result<Option<Self>> {
        match config {
            NotifierConfig::Disabled => Ok(None),
            NotifierConfig::Ifttt {
                maker_key,
                event_name,
            } => Self::new(maker_key.clone(), event_name.clone()).map(Some),
        }
    }

    /// Point the notifier at a different webhook root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn trigger_url(&self) -> String {
        format!(
            "{}/trigger/{}/with/key/{}",
            self.base_url, self.event_name, self.maker_key
        )
    }
}

#[async_trait]
impl Notifier for IftttNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let payload = WebhookPayload::from(notification);

        let response = self
            .client
            .post(self.trigger_url())
            .json(&payload)
            .send()
            .await
            // reqwest errors embed the URL, which carries the key
            .map_err(|e| Error::notifier(format!("IFTTT request failed: {}", e.without_url())))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(Error::notifier(format!(
                "IFTTT responded with HTTP/{}",
                status.as_u16()
            )));
        }

        tracing::debug!(
            "IFTTT event [{}] sent for {}",
            self.event_name,
            notification.hostname
        );
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "ifttt"
    }
}
