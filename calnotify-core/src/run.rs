//! One reminder pass over a feed.

use crate::error::CalNotifyResult;
use crate::fanout::{DeliveryStats, dispatch};
use crate::feed::FeedDocument;
use crate::index::Schedule;
use crate::lead_time::{Granularity, match_all};
use crate::message::TemplateOptions;
use crate::rules::RuleSet;
use crate::sink::Notifier;
use crate::time::Clock;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub clock: Clock,
    pub granularity: Granularity,
    pub prefix: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub occurrences: usize,
    pub matches: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Decode the feed, match it against the rules and notify every match.
///
/// Feed problems abort before any sink is called. Sink failures are
/// counted in the summary and never abort the run.
pub async fn run(
    feed: &FeedDocument,
    rules: &RuleSet,
    options: &RunOptions,
    notifier: &dyn Notifier,
) -> CalNotifyResult<RunSummary> {
    let schedule = Schedule::from_feed(feed)?;
    let template = TemplateOptions {
        prefix: options.prefix.clone(),
        tz: options.clock.tz,
    };

    tracing::info!(
        occurrences = schedule.occurrences.len(),
        events = schedule.index.events().len(),
        rules = rules.len(),
        mode = %options.granularity,
        "checking upcoming events"
    );

    let mut summary = RunSummary {
        occurrences: schedule.occurrences.len(),
        ..RunSummary::default()
    };
    let mut stats = DeliveryStats::default();

    for matched in match_all(options.clock, &schedule.occurrences, rules, options.granularity) {
        summary.matches += 1;
        tracing::debug!(
            occurrence = %matched.occurrence.id,
            starts_at = %matched.occurrence.starts_at,
            days_away = matched.rule.days_away,
            "lead time reached"
        );
        stats += dispatch(&matched, &schedule.index, notifier, &template).await?;
    }

    summary.sent = stats.sent;
    summary.failed = stats.failed;
    Ok(summary)
}
