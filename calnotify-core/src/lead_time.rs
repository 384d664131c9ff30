//! Lead-time matching: does an occurrence start `days_away` days from now?

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Occurrence;
use crate::rules::{NotifyRule, RuleSet};
use crate::time::Clock;

/// How "N days away" is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// A sliding 24 hour window ending `days_away` days before the start:
    /// `start - (d+1) days < now < start - d days`.
    Window,
    /// The start falls on the calendar date `today + days_away` in the
    /// clock's timezone.
    #[default]
    CalendarDay,
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "window" | "sliding" => Ok(Granularity::Window),
            "calendar-day" | "calendar_day" | "day" => Ok(Granularity::CalendarDay),
            other => Err(format!(
                "unknown lead-time mode '{}' (expected 'calendar-day' or 'window')",
                other
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Window => write!(f, "window"),
            Granularity::CalendarDay => write!(f, "calendar-day"),
        }
    }
}

/// A rule whose lead time holds for an occurrence at evaluation time.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub occurrence: &'a Occurrence,
    pub rule: &'a NotifyRule,
}

pub fn is_within_lead_time(
    clock: &Clock,
    start: &DateTime<Utc>,
    days_away: i64,
    granularity: Granularity,
) -> bool {
    match granularity {
        Granularity::Window => {
            let (Some(near), Some(far)) = (
                TimeDelta::try_days(days_away),
                days_away.checked_add(1).and_then(TimeDelta::try_days),
            ) else {
                return false;
            };
            match (start.checked_sub_signed(far), start.checked_sub_signed(near)) {
                (Some(opens), Some(closes)) => opens < clock.now && clock.now < closes,
                _ => false,
            }
        }
        Granularity::CalendarDay => TimeDelta::try_days(days_away)
            .and_then(|offset| clock.today().checked_add_signed(offset))
            .is_some_and(|target| target == clock.local_date(start)),
    }
}

/// Pair every occurrence with every rule whose lead time holds.
///
/// Rules are visited in configuration order. An occurrence can match
/// several rules in one run; each match is reported.
pub fn match_all<'a>(
    clock: Clock,
    occurrences: &'a [Occurrence],
    rules: &'a RuleSet,
    granularity: Granularity,
) -> impl Iterator<Item = Match<'a>> + 'a {
    occurrences.iter().flat_map(move |occurrence| {
        rules
            .iter()
            .filter(move |rule| {
                is_within_lead_time(&clock, &occurrence.starts_at, rule.days_away, granularity)
            })
            .map(move |rule| Match { occurrence, rule })
    })
}
