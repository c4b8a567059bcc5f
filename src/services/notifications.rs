use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::errors::ServiceError;

/// A templated email handed off to the mailer. The mailer owns template
/// rendering; services only supply the template name and its data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotification {
    pub to: String,
    pub subject: String,
    pub template: String,
    pub data: serde_json::Value,
}

/// Outbound notification channel. Implementations must be cheap to
/// clone behind an Arc and safe to call concurrently.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: EmailNotification) -> Result<(), ServiceError>;
}

/// Posts notifications to an external mailer over HTTP.
pub struct WebhookMailer {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookMailer {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl NotificationSender for WebhookMailer {
    #[instrument(skip(self, notification), fields(to = %notification.to, template = %notification.template))]
    async fn send(&self, notification: EmailNotification) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&notification)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Mailer request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Mailer returned status {}",
                response.status()
            )));
        }
        debug!("Notification delivered");
        Ok(())
    }
}

/// Discards notifications. Used when no mailer is configured and in tests.
#[derive(Default)]
pub struct NoopMailer;

#[async_trait]
impl NotificationSender for NoopMailer {
    async fn send(&self, notification: EmailNotification) -> Result<(), ServiceError> {
        debug!(to = %notification.to, subject = %notification.subject, "Notification dropped (no mailer configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn noop_mailer_accepts_everything() {
        let mailer = NoopMailer;
        let note = EmailNotification {
            to: "student@example.com".to_string(),
            subject: "Welcome".to_string(),
            template: "welcome".to_string(),
            data: json!({}),
        };
        assert!(mailer.send(note).await.is_ok());
    }
}
