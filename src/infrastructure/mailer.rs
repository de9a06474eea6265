//! Mail transport capability
//!
//! The dispatcher only needs `send(to, subject, html) -> success | failure`,
//! fire-and-forget per call. The default transport posts the message to an
//! HTTP mail relay; without a configured relay, sends are logged instead of
//! delivered.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::infrastructure::config::MailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Sends mail through an HTTP relay endpoint accepting
/// `{from, to, subject, html}` JSON.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    relay_url: String,
    from: String,
}

impl HttpRelayMailer {
    pub fn new(relay_url: String, from: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create mail relay client")?;
        Ok(Self {
            client,
            relay_url,
            from,
        })
    }

    /// Builds the configured transport: the HTTP relay when one is set,
    /// otherwise the logging fallback.
    pub fn from_config(config: &MailConfig) -> Result<std::sync::Arc<dyn Mailer>> {
        match &config.relay_url {
            Some(relay_url) => Ok(std::sync::Arc::new(Self::new(
                relay_url.clone(),
                config.from.clone(),
            )?)),
            None => {
                tracing::warn!("No mail relay configured; e-mails will only be logged");
                Ok(std::sync::Arc::new(LogMailer))
            }
        }
    }
}

#[async_trait]
impl Mailer for HttpRelayMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<()> {
        let message = RelayMessage {
            from: &self.from,
            to,
            subject,
            html: html_body,
        };
        let response = self
            .client
            .post(&self.relay_url)
            .json(&message)
            .send()
            .await
            .context("Mail relay request failed")?;
        response
            .error_for_status()
            .context("Mail relay rejected the message")?;
        Ok(())
    }
}

/// Development transport: logs instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _html_body: &str) -> Result<()> {
        tracing::info!("Would send e-mail {subject:?} to {to}");
        Ok(())
    }
}
