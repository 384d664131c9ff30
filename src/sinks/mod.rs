//! Live delivery: SendGrid for email, Twilio for SMS.

mod sendgrid;
mod twilio;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use calnotify_core::CalNotifyResult;
use calnotify_core::sink::{DryRunNotifier, Notifier};

use crate::config::SinkConfig;
use sendgrid::SendGridMailer;
use twilio::TwilioMessenger;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct LiveNotifier {
    mailer: SendGridMailer,
    messenger: TwilioMessenger,
}

#[async_trait]
impl Notifier for LiveNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> CalNotifyResult<()> {
        self.mailer.send(to, subject, body).await
    }

    async fn send_sms(&self, to: &str, body: &str) -> CalNotifyResult<()> {
        self.messenger.send(to, body).await
    }
}

/// Build the notifier for this run: dry-run in test mode, live otherwise.
pub fn build_notifier(config: &SinkConfig) -> Result<Box<dyn Notifier>> {
    match config {
        SinkConfig::DryRun => Ok(Box::new(DryRunNotifier::new())),
        SinkConfig::Live { sendgrid, twilio } => {
            let client = reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .context("Failed to build HTTP client")?;

            Ok(Box::new(LiveNotifier {
                mailer: SendGridMailer::new(client.clone(), sendgrid.clone()),
                messenger: TwilioMessenger::new(client, twilio.clone()),
            }))
        }
    }
}
