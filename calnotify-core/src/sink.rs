//! Outbound delivery channels.
//!
//! The fan-out only talks to [`Notifier`]. Concrete transports (SendGrid,
//! Twilio) live in the binary; [`DryRunNotifier`] is the no-network sink
//! used for test mode.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::CalNotifyResult;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> CalNotifyResult<()>;

    async fn send_sms(&self, to: &str, body: &str) -> CalNotifyResult<()>;
}

/// A would-be sink call, as recorded by [`DryRunNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Email {
        to: String,
        subject: String,
        body: String,
    },
    Sms {
        to: String,
        body: String,
    },
}

/// Logs and records every call instead of sending anything.
#[derive(Debug, Default)]
pub struct DryRunNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl DryRunNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.lock().clone()
    }

    pub fn email_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|d| matches!(d, Delivery::Email { .. }))
            .count()
    }

    pub fn sms_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|d| matches!(d, Delivery::Sms { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Delivery>> {
        // a panic while holding the lock cannot leave the Vec half-written
        self.deliveries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Notifier for DryRunNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> CalNotifyResult<()> {
        tracing::info!(to, subject, "[dry run] email");
        tracing::debug!("{}", body);
        self.lock().push(Delivery::Email {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_sms(&self, to: &str, body: &str) -> CalNotifyResult<()> {
        tracing::info!(to, body, "[dry run] sms");
        self.lock().push(Delivery::Sms {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
