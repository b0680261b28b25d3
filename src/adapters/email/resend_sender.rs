//! Resend email adapter.
//!
//! Implements `NotificationSender` over the Resend HTTP API.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

use super::templates::render;
use crate::domain::foundation::DomainError;
use crate::ports::{Notification, NotificationSender};

/// Configuration for the Resend sender.
#[derive(Debug, Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    /// Sender, e.g. `Coach Billing <billing@example.com>`.
    pub from: String,
    /// Base URL for the API (default: https://api.resend.com).
    pub base_url: String,
    pub timeout: Duration,
}

impl ResendConfig {
    pub fn new(api_key: SecretString, from: impl Into<String>) -> Self {
        Self {
            api_key,
            from: from.into(),
            base_url: "https://api.resend.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

pub struct ResendNotificationSender {
    config: ResendConfig,
    client: Client,
}

impl ResendNotificationSender {
    pub fn new(config: ResendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl NotificationSender for ResendNotificationSender {
    async fn send(&self, notification: Notification) -> Result<(), DomainError> {
        let email = render(&notification);
        let body = SendEmailRequest {
            from: &self.config.from,
            to: [notification.recipient()],
            subject: &email.subject,
            text: &email.text,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.config.base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| DomainError::external("email", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DomainError::external(
                "email",
                format!("Resend returned {}: {}", status, detail),
            ));
        }

        tracing::info!(kind = notification.kind(), "Email sent");
        Ok(())
    }
}
