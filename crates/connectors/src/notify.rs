//! OTP delivery over transactional email / SMS webhooks.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use engine::{EngineError, Notifier, OtpChannel, OtpNotification};

use crate::ConnectorError;

/// Posts passcode notifications to the configured delivery endpoints.
/// A channel without an endpoint is a no-op: signup still succeeds and
/// the passcode is only visible in the logs.
#[derive(Clone, Debug)]
pub struct WebhookNotifier {
    client: Client,
    email_url: Option<String>,
    sms_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(client: Client, email_url: Option<String>, sms_url: Option<String>) -> Self {
        Self {
            client,
            email_url,
            sms_url,
        }
    }

    async fn post(&self, url: &str, body: serde_json::Value) -> Result<(), ConnectorError> {
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ConnectorError::Api { status, message });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_otp(&self, notification: &OtpNotification) -> Result<(), EngineError> {
        let (url, body) = match notification.channel {
            OtpChannel::Email => (
                self.email_url.as_deref(),
                json!({
                    "to": notification.email,
                    "full_name": notification.full_name,
                    "otp": notification.otp,
                }),
            ),
            OtpChannel::Sms => (
                self.sms_url.as_deref(),
                json!({
                    "to": notification.phone_number,
                    "otp": notification.otp,
                }),
            ),
        };

        let Some(url) = url else {
            tracing::warn!(
                "no delivery endpoint configured for {:?}, skipping otp notification",
                notification.channel
            );
            return Ok(());
        };

        self.post(url, body).await.map_err(|err| {
            tracing::error!("otp delivery failed: {err}");
            EngineError::from(err)
        })
    }
}
