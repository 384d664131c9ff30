//! Typed calendar records.
//!
//! The feed decoder turns raw JSON:API records into these types, and the
//! rest of the crate works exclusively with them for matching and fan-out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recurring calendar entry (the parent of its occurrences)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
}

/// One concrete scheduled instance of an [`Event`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    pub id: String,
    pub event_id: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Overrides the event's location when present
    pub location: Option<String>,
    /// Sub-time ids in feed order, resolved against the index on demand
    pub sub_time_ids: Vec<String>,
}

impl Occurrence {
    pub fn has_sub_times(&self) -> bool {
        !self.sub_time_ids.is_empty()
    }
}

/// A separately published time range within an occurrence
/// (e.g. the service itself, as opposed to setup or teardown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTime {
    pub id: String,
    pub occurrence_id: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Label such as "Setup" or "Service", when the feed gives one
    pub name: Option<String>,
    /// Only visible sub-times are notified
    pub visible: bool,
}

/// The time range reported in a single notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationWindow {
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub location: Option<String>,
}
