//! SMS through a Twilio Messaging Service.

use std::collections::HashMap;

use calnotify_core::{CalNotifyError, CalNotifyResult};
use serde::Deserialize;

use crate::config::TwilioConfig;

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

pub struct TwilioMessenger {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioMessenger {
    pub fn new(client: reqwest::Client, config: TwilioConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json",
            sid = self.config.account_sid
        )
    }

    /// `to` must be an E.164 number such as "+15551234567".
    pub async fn send(&self, to: &str, body: &str) -> CalNotifyResult<()> {
        let form_body = message_form(&self.config.messaging_service_sid, to, body);

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form_body)
            .send()
            .await
            .map_err(|e| CalNotifyError::Sink(format!("Twilio request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let detail = match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(ErrorResponse {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{} (code {})", message, code),
                _ => text,
            };
            return Err(CalNotifyError::Sink(format!(
                "Twilio returned {}: {}",
                status, detail
            )));
        }

        let message: MessageResponse = serde_json::from_str(&text).map_err(|e| {
            CalNotifyError::Sink(format!("Failed to parse Twilio response: {}", e))
        })?;
        tracing::debug!(
            to,
            sid = %message.sid,
            status = message.status.as_deref().unwrap_or("unknown"),
            "sms queued by Twilio"
        );
        Ok(())
    }
}

fn message_form<'a>(service_sid: &'a str, to: &'a str, body: &'a str) -> HashMap<&'static str, &'a str> {
    let mut form_body = HashMap::new();
    form_body.insert("MessagingServiceSid", service_sid);
    form_body.insert("To", to);
    form_body.insert("Body", body);
    form_body
}
