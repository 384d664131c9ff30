//! Reminder message template.

use chrono_tz::Tz;

use crate::event::NotificationWindow;
use crate::time::format_date;

/// Values every message of a run is rendered with.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Prepended to every subject line, e.g. "[Reminder] "
    pub prefix: String,
    pub tz: Tz,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl Message {
    pub fn reminder(window: &NotificationWindow, days_away: i64, options: &TemplateOptions) -> Self {
        let start = format_date(&window.starts_at, &options.tz);
        let end = format_date(&window.ends_at, &options.tz);

        let subject = format!("{}{} at {}", options.prefix, window.name, start);
        let body = format!(
            "\nDon't forget!  There is an event coming up in {} days!\n\
             \n\
             Event: {}\n\
             Time: from {} to {}\n\
             Location: {}\n",
            days_away,
            window.name,
            start,
            end,
            window.location.as_deref().unwrap_or_default(),
        );

        Message { subject, body }
    }

    /// Text sent over SMS: the subject line alone.
    pub fn sms_text(&self) -> &str {
        &self.subject
    }
}
