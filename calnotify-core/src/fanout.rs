//! Notification fan-out: one sink call per (window, contact).

use std::ops::AddAssign;

use crate::error::CalNotifyResult;
use crate::event::{Event, NotificationWindow, Occurrence};
use crate::index::OccurrenceIndex;
use crate::lead_time::Match;
use crate::message::{Message, TemplateOptions};
use crate::rules::{Channel, NotifyRule};
use crate::sink::Notifier;

/// Outcome counts for a batch of sink calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: usize,
    pub failed: usize,
}

impl AddAssign for DeliveryStats {
    fn add_assign(&mut self, other: Self) {
        self.sent += other.sent;
        self.failed += other.failed;
    }
}

/// The time ranges to report for an occurrence.
///
/// Without resolvable sub-times the occurrence itself is the only window.
/// Otherwise only the visible sub-times are reported, so an occurrence whose
/// sub-times are all hidden yields nothing.
pub fn windows_for(
    occurrence: &Occurrence,
    event: &Event,
    index: &OccurrenceIndex,
) -> Vec<NotificationWindow> {
    let location = occurrence.location.clone().or_else(|| event.location.clone());
    let sub_times = index.sub_times_for(occurrence);

    if sub_times.is_empty() {
        return vec![NotificationWindow {
            name: event.name.clone(),
            starts_at: occurrence.starts_at,
            ends_at: occurrence.ends_at,
            location,
        }];
    }

    sub_times
        .into_iter()
        .filter(|t| t.visible)
        .map(|t| NotificationWindow {
            name: event.name.clone(),
            starts_at: t.starts_at,
            ends_at: t.ends_at,
            location: location.clone(),
        })
        .collect()
}

/// Send one window to every contact of a rule, in configured order.
///
/// A failing contact is logged and counted; the remaining contacts are
/// still notified.
pub async fn notify(
    window: &NotificationWindow,
    rule: &NotifyRule,
    notifier: &dyn Notifier,
    options: &TemplateOptions,
) -> DeliveryStats {
    let message = Message::reminder(window, rule.days_away, options);
    let mut stats = DeliveryStats::default();

    for contact in &rule.contacts {
        let result = match contact.channel {
            Channel::Email => {
                notifier
                    .send_email(&contact.address, &message.subject, &message.body)
                    .await
            }
            Channel::Sms => notifier.send_sms(&contact.address, message.sms_text()).await,
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    channel = %contact.channel,
                    to = %contact.address,
                    days_away = rule.days_away,
                    "sent: {}",
                    message.subject
                );
                stats.sent += 1;
            }
            Err(e) => {
                tracing::warn!(
                    channel = %contact.channel,
                    to = %contact.address,
                    error = %e,
                    "failed to send reminder"
                );
                stats.failed += 1;
            }
        }
    }

    stats
}

/// Notify every window of a match.
pub async fn dispatch(
    matched: &Match<'_>,
    index: &OccurrenceIndex,
    notifier: &dyn Notifier,
    options: &TemplateOptions,
) -> CalNotifyResult<DeliveryStats> {
    let event = index.event_for(matched.occurrence)?;
    let windows = windows_for(matched.occurrence, event, index);

    if windows.is_empty() {
        tracing::debug!(
            occurrence = %matched.occurrence.id,
            event = %event.name,
            "no visible event times, nothing to send"
        );
    }

    let mut stats = DeliveryStats::default();
    for window in &windows {
        stats += notify(window, matched.rule, notifier, options).await;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalNotifyError;
    use crate::feed::FeedDocument;
    use crate::index::Schedule;
    use crate::rules::Contact;
    use crate::sink::{Delivery, DryRunNotifier};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;

    fn options() -> TemplateOptions {
        TemplateOptions {
            prefix: String::new(),
            tz: chrono_tz::UTC,
        }
    }

    fn event_time(id: &str, hour: u32, visible: bool) -> serde_json::Value {
        json!({"type": "EventTime", "id": id, "attributes": {
            "starts_at": format!("2021-08-22T{:02}:00:00Z", hour),
            "ends_at": format!("2021-08-22T{:02}:30:00Z", hour),
            "visible_on_widget_and_ical": visible
        }})
    }

    fn schedule_with_times(times: Vec<serde_json::Value>) -> Schedule {
        let refs: Vec<_> = times.iter().map(|t| json!({"id": t["id"]})).collect();
        let mut included = vec![json!({
            "type": "Event", "id": "1",
            "attributes": {"name": "Sunday Service", "location": "Main Campus"}
        })];
        included.extend(times);

        let mut relationships = json!({"event": {"data": {"id": "1"}}});
        if !refs.is_empty() {
            relationships["event_times"] = json!({"data": refs});
        }

        let feed = FeedDocument::from_value(json!({
            "data": [{
                "id": "100",
                "attributes": {
                    "starts_at": "2021-08-22T08:00:00Z",
                    "ends_at": "2021-08-22T13:00:00Z",
                    "location": null
                },
                "relationships": relationships
            }],
            "included": included
        }))
        .unwrap();

        Schedule::from_feed(&feed).unwrap()
    }

    fn schedule_with_refs(refs: serde_json::Value, times: Vec<serde_json::Value>) -> Schedule {
        let mut included = vec![json!({
            "type": "Event", "id": "1",
            "attributes": {"name": "Sunday Service", "location": "Main Campus"}
        })];
        included.extend(times);

        let feed = FeedDocument::from_value(json!({
            "data": [{
                "id": "100",
                "attributes": {
                    "starts_at": "2021-08-22T08:00:00Z",
                    "ends_at": "2021-08-22T13:00:00Z"
                },
                "relationships": {
                    "event": {"data": {"id": "1"}},
                    "event_times": {"data": refs}
                }
            }],
            "included": included
        }))
        .unwrap();

        Schedule::from_feed(&feed).unwrap()
    }

    fn windows(schedule: &Schedule) -> Vec<NotificationWindow> {
        let occurrence = &schedule.occurrences[0];
        let event = schedule.event_for(occurrence).unwrap();
        windows_for(occurrence, event, &schedule.index)
    }

    #[test]
    fn test_no_sub_times_yields_the_occurrence() {
        let schedule = schedule_with_times(vec![]);
        let windows = windows(&schedule);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].name, "Sunday Service");
        assert_eq!(windows[0].starts_at, Utc.with_ymd_and_hms(2021, 8, 22, 8, 0, 0).unwrap());
        // falls back to the event's location
        assert_eq!(windows[0].location.as_deref(), Some("Main Campus"));
    }

    #[test]
    fn test_only_visible_sub_times_are_windows() {
        let schedule = schedule_with_times(vec![
            event_time("setup", 8, false),
            event_time("service", 10, true),
            event_time("teardown", 12, false),
        ]);
        let windows = windows(&schedule);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].starts_at, Utc.with_ymd_and_hms(2021, 8, 22, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_visible_sub_times_keep_feed_order() {
        let schedule = schedule_with_times(vec![
            event_time("second", 11, true),
            event_time("first", 9, true),
        ]);
        let hours: Vec<_> = windows(&schedule)
            .iter()
            .map(|w| w.starts_at.format("%H").to_string())
            .collect();
        assert_eq!(hours, vec!["11", "09"]);
    }

    #[test]
    fn test_unresolved_sub_times_fall_back_to_the_occurrence() {
        let schedule = schedule_with_refs(json!([{"id": "t1"}, {"id": "t2"}]), vec![]);
        let windows = windows(&schedule);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].starts_at, Utc.with_ymd_and_hms(2021, 8, 22, 8, 0, 0).unwrap());
        assert_eq!(windows[0].ends_at, Utc.with_ymd_and_hms(2021, 8, 22, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_partly_resolved_sub_times_use_what_is_included() {
        let schedule = schedule_with_refs(
            json!([{"id": "missing"}, {"id": "service"}]),
            vec![event_time("service", 10, true)],
        );
        let windows = windows(&schedule);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].starts_at, Utc.with_ymd_and_hms(2021, 8, 22, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_all_hidden_sub_times_yield_nothing() {
        let schedule = schedule_with_times(vec![
            event_time("setup", 8, false),
            event_time("teardown", 12, false),
        ]);
        assert!(windows(&schedule).is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_calls_each_sink_per_window_and_contact() {
        let schedule = schedule_with_times(vec![
            event_time("early", 9, true),
            event_time("late", 11, true),
        ]);
        let rule = NotifyRule::new(
            1,
            vec![Contact::email("a@example.com"), Contact::sms("+15551234567")],
        );
        let matched = Match {
            occurrence: &schedule.occurrences[0],
            rule: &rule,
        };
        let notifier = DryRunNotifier::new();

        let stats = dispatch(&matched, &schedule.index, &notifier, &options())
            .await
            .unwrap();

        assert_eq!(stats, DeliveryStats { sent: 4, failed: 0 });
        assert_eq!(notifier.email_count(), 2);
        assert_eq!(notifier.sms_count(), 2);
    }

    /// Fails for one address, records the rest.
    struct FlakyNotifier {
        broken: &'static str,
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for FlakyNotifier {
        async fn send_email(&self, to: &str, _subject: &str, _body: &str) -> CalNotifyResult<()> {
            self.send_sms(to, "").await
        }

        async fn send_sms(&self, to: &str, _body: &str) -> CalNotifyResult<()> {
            if to == self.broken {
                return Err(CalNotifyError::Sink(format!("provider rejected {}", to)));
            }
            self.delivered.lock().unwrap().push(to.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_later_contacts() {
        let window = windows(&schedule_with_times(vec![])).remove(0);
        let rule = NotifyRule::new(
            1,
            vec![Contact::email("broken@example.com"), Contact::sms("+15551234567")],
        );
        let notifier = FlakyNotifier {
            broken: "broken@example.com",
            delivered: Mutex::new(vec![]),
        };

        let stats = notify(&window, &rule, &notifier, &options()).await;

        assert_eq!(stats, DeliveryStats { sent: 1, failed: 1 });
        assert_eq!(*notifier.delivered.lock().unwrap(), vec!["+15551234567"]);
    }

    /// Fails the first `failures` calls, then delivers.
    struct FailsFirst {
        failures: Mutex<usize>,
        delivered: Mutex<Vec<String>>,
    }

    impl FailsFirst {
        fn new(failures: usize) -> Self {
            Self {
                failures: Mutex::new(failures),
                delivered: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Notifier for FailsFirst {
        async fn send_email(&self, _to: &str, subject: &str, _body: &str) -> CalNotifyResult<()> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(CalNotifyError::Sink("rate limited".to_string()));
            }
            self.delivered.lock().unwrap().push(subject.to_string());
            Ok(())
        }

        async fn send_sms(&self, _to: &str, body: &str) -> CalNotifyResult<()> {
            self.send_email("", body, "").await
        }
    }

    #[tokio::test]
    async fn test_failure_in_first_window_does_not_stop_the_next() {
        let schedule = schedule_with_times(vec![
            event_time("early", 9, true),
            event_time("late", 11, true),
        ]);
        let rule = NotifyRule::new(1, vec![Contact::email("a@example.com")]);
        let matched = Match {
            occurrence: &schedule.occurrences[0],
            rule: &rule,
        };
        let notifier = FailsFirst::new(1);

        let stats = dispatch(&matched, &schedule.index, &notifier, &options())
            .await
            .unwrap();

        assert_eq!(stats, DeliveryStats { sent: 1, failed: 1 });
        let delivered = notifier.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert!(delivered[0].contains("11:00:00 AM"));
    }

    #[tokio::test]
    async fn test_failure_in_first_match_does_not_stop_the_next() {
        let schedule = schedule_with_times(vec![]);
        let first = NotifyRule::new(1, vec![Contact::email("a@example.com")]);
        let second = NotifyRule::new(7, vec![Contact::sms("+15551234567")]);
        let notifier = FailsFirst::new(1);

        let mut stats = DeliveryStats::default();
        for rule in [&first, &second] {
            let matched = Match {
                occurrence: &schedule.occurrences[0],
                rule,
            };
            stats += dispatch(&matched, &schedule.index, &notifier, &options())
                .await
                .unwrap();
        }

        assert_eq!(stats, DeliveryStats { sent: 1, failed: 1 });
        assert_eq!(notifier.delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_message_embeds_rule_offset() {
        let window = windows(&schedule_with_times(vec![])).remove(0);
        let notifier = DryRunNotifier::new();

        notify(
            &window,
            &NotifyRule::new(7, vec![Contact::email("a@example.com")]),
            &notifier,
            &options(),
        )
        .await;

        let Delivery::Email { body, .. } = &notifier.deliveries()[0] else {
            panic!("expected an email");
        };
        assert!(body.contains("coming up in 7 days"));
    }
}
