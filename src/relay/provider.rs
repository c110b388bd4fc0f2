use crate::error::Res;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// The Resend "send email" endpoint.
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// The request body sent to the mail provider.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// What the provider answered. `body` is `Value::Null` when the reply was not JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderReply {
    pub status: u16,
    pub body: Value,
}

impl ProviderReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// An upstream mail API. `Err` means the provider could not be reached or did not answer;
/// a rejection is an `Ok` reply with a non-2xx status.
#[async_trait::async_trait]
pub trait MailProvider: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Res<ProviderReply>;
}

/// Sends mail through the Resend HTTP API.
pub struct ResendProvider {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl ResendProvider {
    pub fn new(api_key: impl Into<String>) -> Res<Self> {
        Self::with_url(api_key, RESEND_API_URL)
    }

    /// Uses `url` instead of the public Resend endpoint.
    pub fn with_url(api_key: impl Into<String>, url: impl Into<String>) -> Res<Self> {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl MailProvider for ResendProvider {
    async fn send(&self, mail: &OutgoingMail) -> Res<ProviderReply> {
        debug!("POST {} for {:?}", self.url, mail.to);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(mail)
            .send()
            .await
            .context("Unable to reach the mail provider")?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .context("Unable to read the mail provider's reply")?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Ok(ProviderReply { status, body })
    }
}
