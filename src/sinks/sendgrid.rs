//! Plain-text email over the SendGrid v3 mail API.

use calnotify_core::{CalNotifyError, CalNotifyResult};
use serde_json::json;

use crate::config::SendGridConfig;

const SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

pub struct SendGridMailer {
    client: reqwest::Client,
    config: SendGridConfig,
}

impl SendGridMailer {
    pub fn new(client: reqwest::Client, config: SendGridConfig) -> Self {
        Self { client, config }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> CalNotifyResult<()> {
        let response = self
            .client
            .post(SEND_URL)
            .bearer_auth(&self.config.api_key)
            .json(&mail_payload(&self.config.mail_from, to, subject, body))
            .send()
            .await
            .map_err(|e| CalNotifyError::Sink(format!("SendGrid request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CalNotifyError::Sink(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )));
        }

        tracing::debug!(to, status = %status, "email accepted by SendGrid");
        Ok(())
    }
}

fn mail_payload(from: &str, to: &str, subject: &str, body: &str) -> serde_json::Value {
    json!({
        "personalizations": [{ "to": [{ "email": to }] }],
        "from": { "email": from },
        "subject": subject,
        "content": [{ "type": "text/plain", "value": body }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_payload_shape() {
        let payload = mail_payload("from@example.com", "to@example.com", "Subject", "Text");

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "to@example.com");
        assert_eq!(payload["from"]["email"], "from@example.com");
        assert_eq!(payload["subject"], "Subject");
        assert_eq!(payload["content"][0]["type"], "text/plain");
        assert_eq!(payload["content"][0]["value"], "Text");
    }
}
