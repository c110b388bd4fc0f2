//! Delivery of emails to the relay.
//!
//! `Dispatcher` is the seam between the alert pipeline and the network. In `Mode::Live` emails
//! are POSTed to the relay with `RelayDispatcher`; in `Mode::Testing` they are kept in memory by
//! `TestDispatcher`, so the whole program can run top to bottom without sending mail.

mod test_dispatcher;

pub use test_dispatcher::{TestDispatcher, FAILING_DOMAIN};

use crate::email::Email;
use crate::error::{ErrorType, IntoResult, Res};
use crate::Result;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable that, when set to a non-empty value, selects `Mode::Testing`.
pub const TEST_MODE_ENV: &str = "EDUWALLET_IN_TEST_MODE";

const RELAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Selects how emails are delivered.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// Send through the email relay.
    #[default]
    Live,
    /// Keep sent emails in memory.
    Testing,
}

impl Mode {
    /// `Mode::Testing` when `EDUWALLET_IN_TEST_MODE` is set and non-empty, else `Mode::Live`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(v) if !v.is_empty() => Mode::Testing,
            _ => Mode::Live,
        }
    }
}

/// Sends one email. An `Err` means the email was not delivered.
#[async_trait::async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, email: &Email) -> Res<()>;
}

/// Creates the dispatcher for `mode`.
pub fn dispatcher(mode: Mode, relay_url: &str) -> Res<Box<dyn Dispatcher>> {
    Ok(match mode {
        Mode::Live => Box::new(RelayDispatcher::new(relay_url)?),
        Mode::Testing => Box::new(TestDispatcher),
    })
}

/// Sends `email`, tagging a failure as a dispatch error.
pub async fn try_deliver(dispatcher: &dyn Dispatcher, email: &Email) -> Result<()> {
    dispatcher
        .send(email)
        .await
        .with_context(|| format!("Unable to send email '{}' to {}", email.subject, email.to))
        .pub_result(ErrorType::Dispatch)
}

/// Sends `email` and reports whether it was delivered. Failures are logged, never returned:
/// a failed notification must not undo or block the action that triggered it.
pub async fn deliver(dispatcher: &dyn Dispatcher, email: &Email) -> bool {
    match try_deliver(dispatcher, email).await {
        Ok(()) => {
            info!("Email '{}' sent to {}", email.subject, email.to);
            true
        }
        Err(e) => {
            warn!("{e}");
            false
        }
    }
}

/// POSTs `{to, subject, html}` to the relay's send-email endpoint.
pub struct RelayDispatcher {
    client: reqwest::Client,
    url: String,
}

impl RelayDispatcher {
    pub fn new(url: impl Into<String>) -> Res<Self> {
        let client = reqwest::Client::builder()
            .timeout(RELAY_TIMEOUT)
            .build()
            .context("Unable to build the HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// The relay's answer. Success is decided by `success`, not by the HTTP status.
#[derive(Debug, Deserialize)]
struct RelayReply {
    success: bool,
    error: Option<String>,
}

#[async_trait::async_trait]
impl Dispatcher for RelayDispatcher {
    async fn send(&self, email: &Email) -> Res<()> {
        debug!("POST {} for {}", self.url, email.to);
        let response = self
            .client
            .post(&self.url)
            .json(email)
            .send()
            .await
            .with_context(|| format!("Unable to reach the email relay at {}", self.url))?;
        let status = response.status();
        let reply: RelayReply = response
            .json()
            .await
            .with_context(|| format!("The email relay returned an unreadable reply ({status})"))?;
        if !reply.success {
            bail!(
                "The email relay reported a failure ({status}): {}",
                reply.error.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }
}
