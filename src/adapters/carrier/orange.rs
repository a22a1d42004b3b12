use crate::adapters::carrier::{SmsProvider, TransportError};
use crate::config::CarrierConfig;
use crate::domain::submission::SubmissionOutcome;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct OutboundResponse {
    #[serde(rename = "outboundSMSMessageRequest")]
    request: OutboundRequestEcho,
}

#[derive(Debug, Deserialize)]
struct OutboundRequestEcho {
    #[serde(rename = "resourceURL")]
    resource_url: String,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// The carrier's message id is the last path segment of the resource URL it returns.
#[must_use]
pub fn provider_id_from_resource_url(resource_url: &str) -> Option<&str> {
    resource_url.trim_end_matches('/').rsplit('/').next().filter(|id| !id.is_empty())
}

/// Orange SMS API client.
///
/// Holds one connection pool and one client-credentials token for all sends; the token
/// is fetched lazily and refreshed shortly before the carrier-declared expiry.
pub struct OrangeSmsProvider {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    sender_address: String,
    notify_url: Option<String>,
    refresh_margin: Duration,
    token: Mutex<Option<CachedToken>>,
}

impl std::fmt::Debug for OrangeSmsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrangeSmsProvider")
            .field("base_url", &self.base_url)
            .field("sender_address", &self.sender_address)
            .field("notify_url", &self.notify_url)
            .finish_non_exhaustive()
    }
}

impl OrangeSmsProvider {
    /// Creates a new carrier client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &CarrierConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_secs)).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            sender_address: config.sender_address.clone(),
            notify_url: config.notify_url.clone(),
            refresh_margin: Duration::from_secs(config.token_refresh_margin_secs),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, TransportError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    #[tracing::instrument(level = "debug", skip(self), err)]
    async fn fetch_token(&self) -> Result<CachedToken, TransportError> {
        let response = self
            .client
            .post(format!("{}/oauth/v3/token", self.base_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Authorization(format!("{status}: {body}")));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS));
        tracing::debug!(lifetime_secs = lifetime.as_secs(), "Obtained carrier access token");

        Ok(CachedToken { value: token.access_token, refresh_at: Instant::now() + lifetime.saturating_sub(self.refresh_margin) })
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Asks the carrier to push delivery receipts for an accepted message to our callback.
    async fn subscribe_receipts(&self, token: &str, notify_url: &str, resource_url: &str) -> Result<(), TransportError> {
        let body = json!({
            "deliveryReceiptSubscription": {
                "callbackReference": { "notifyURL": notify_url },
                "resourceURL": resource_url,
            }
        });

        let response = self
            .client
            .post(format!("{}/smsmessaging/v1/outbound/tel:+{}/subscriptions", self.base_url, self.sender_address))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Delivery receipt subscription created");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(TransportError::InvalidResponse(format!("subscription refused with {status}: {body}")))
        }
    }
}

#[async_trait]
impl SmsProvider for OrangeSmsProvider {
    #[tracing::instrument(level = "debug", skip(self, text), fields(text.len = text.len()), err)]
    async fn send_sms(
        &self,
        sender_label: &str,
        destination_number: &str,
        text: &str,
    ) -> Result<SubmissionOutcome, TransportError> {
        let token = self.access_token().await?;

        let body = json!({
            "outboundSMSMessageRequest": {
                "address": format!("tel:+{destination_number}"),
                "senderAddress": format!("tel:+{}", self.sender_address),
                "outboundSMSTextMessage": { "message": text },
                "senderName": sender_label,
            }
        });

        let response = self
            .client
            .post(format!("{}/smsmessaging/v1/outbound/tel:+{}/requests", self.base_url, self.sender_address))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let raw_response = response.text().await?;

        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            tracing::warn!(status = %status, body = %raw_response, "Carrier rejected submission");
            return Ok(SubmissionOutcome::Rejected { reason_code: status.as_u16().to_string() });
        }

        let parsed: OutboundResponse =
            serde_json::from_str(&raw_response).map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let resource_url = parsed.request.resource_url;
        let provider_message_id = provider_id_from_resource_url(&resource_url)
            .ok_or_else(|| TransportError::InvalidResponse(format!("no message id in resource URL {resource_url}")))?
            .to_string();

        if let Some(notify_url) = &self.notify_url
            && let Err(e) = self.subscribe_receipts(&token, notify_url, &resource_url).await
        {
            tracing::warn!(error = %e, "Failed to subscribe to delivery receipts");
        }

        Ok(SubmissionOutcome::Accepted { provider_message_id, raw_response })
    }
}
