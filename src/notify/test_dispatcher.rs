//! An in-memory `Dispatcher`.
//!
//! Note: this is compiled even in the "production" version of this app so that the whole app can
//! run, top-to-bottom, without sending real email.

use crate::email::Email;
use crate::error::Res;
use crate::notify::Dispatcher;
use anyhow::{anyhow, bail};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

/// Recipients on this domain always fail, which lets tests exercise delivery failures.
pub const FAILING_DOMAIN: &str = "fail.invalid";

static OUTBOX: LazyLock<Mutex<HashMap<String, Vec<Email>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Keeps every email it is given, keyed by recipient. The outbox is process wide, so tests
/// should use a unique recipient to avoid seeing each other's mail.
#[derive(Debug, Default, Clone, Copy)]
pub struct TestDispatcher;

impl TestDispatcher {
    /// The emails sent to `to` so far, oldest first.
    pub fn sent_to(to: &str) -> Vec<Email> {
        OUTBOX
            .lock()
            .map(|outbox| outbox.get(to).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Dispatcher for TestDispatcher {
    async fn send(&self, email: &Email) -> Res<()> {
        if email.to.ends_with(&format!("@{FAILING_DOMAIN}")) {
            bail!("Delivery to {} failed", email.to);
        }
        let mut outbox = OUTBOX
            .lock()
            .map_err(|_| anyhow!("The test outbox lock is poisoned"))?;
        outbox.entry(email.to.clone()).or_default().push(email.clone());
        Ok(())
    }
}
