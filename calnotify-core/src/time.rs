//! Date parsing, formatting and the evaluation clock.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{CalNotifyError, CalNotifyResult};

/// Pattern used in every reminder: `08/22/2021 at 10:00:18 PM`
pub const DATE_FORMAT: &str = "%m/%d/%Y at %I:%M:%S %p";

/// The instant a run is evaluated at, and the timezone used for
/// calendar-day comparisons and message formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    pub now: DateTime<Utc>,
    pub tz: Tz,
}

impl Clock {
    pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
        Clock { now, tz }
    }

    /// Snapshot the system clock.
    pub fn system(tz: Tz) -> Self {
        Clock::new(Utc::now(), tz)
    }

    /// Local calendar date of `now`
    pub fn today(&self) -> NaiveDate {
        self.local_date(&self.now)
    }

    /// Calendar date of an instant in this clock's timezone
    pub fn local_date(&self, instant: &DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }
}

/// Parse an ISO-8601 / RFC 3339 timestamp from the feed into UTC.
pub fn parse_timestamp(value: &str) -> CalNotifyResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| CalNotifyError::DateParse {
            value: value.to_string(),
            source,
        })
}

/// Parse an IANA timezone name such as "US/Central" or "America/Chicago".
pub fn parse_timezone(name: &str) -> CalNotifyResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| CalNotifyError::Config(format!("Unknown timezone '{}': {}", name, e)))
}

pub fn format_date(instant: &DateTime<Utc>, tz: &Tz) -> String {
    instant.with_timezone(tz).format(DATE_FORMAT).to_string()
}
