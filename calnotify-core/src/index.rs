//! Occurrence index built from a decoded feed.

use std::collections::HashMap;

use crate::error::{CalNotifyError, CalNotifyResult};
use crate::event::{Event, Occurrence, SubTime};
use crate::feed::{FeedDocument, IncludedRecord, InstanceRecord};
use crate::time::parse_timestamp;

/// Lookup tables for the `included` side of a feed.
#[derive(Debug, Clone, Default)]
pub struct OccurrenceIndex {
    events: HashMap<String, Event>,
    sub_times: HashMap<String, SubTime>,
}

/// Scan `included` once, routing each record by its type tag.
pub fn build_index(feed: &FeedDocument) -> CalNotifyResult<OccurrenceIndex> {
    let mut index = OccurrenceIndex::default();

    for record in &feed.included {
        match record {
            IncludedRecord::Event { id, attributes } => {
                index.events.insert(
                    id.clone(),
                    Event {
                        id: id.clone(),
                        name: attributes.name.clone(),
                        location: attributes.location.clone(),
                    },
                );
            }
            IncludedRecord::EventTime {
                id,
                attributes,
                relationships,
            } => {
                let starts_at = parse_timestamp(&attributes.starts_at)?;
                let ends_at = parse_timestamp(&attributes.ends_at)?;
                check_order("event time", id, &starts_at, &ends_at)?;

                let occurrence_id = relationships
                    .as_ref()
                    .and_then(|r| r.event_instance.as_ref())
                    .map(|r| r.data.id.clone());

                index.sub_times.insert(
                    id.clone(),
                    SubTime {
                        id: id.clone(),
                        occurrence_id,
                        starts_at,
                        ends_at,
                        name: attributes.name.clone(),
                        visible: attributes.visible_on_widget_and_ical,
                    },
                );
            }
            IncludedRecord::Unknown => {}
        }
    }

    Ok(index)
}

/// Iterate the primary records as typed occurrences.
///
/// The iterator borrows the feed and can be recreated at will; each item
/// fails independently if its timestamps do not parse.
pub fn occurrences(feed: &FeedDocument) -> impl Iterator<Item = CalNotifyResult<Occurrence>> + '_ {
    feed.data.iter().map(occurrence_from_record)
}

fn occurrence_from_record(record: &InstanceRecord) -> CalNotifyResult<Occurrence> {
    let starts_at = parse_timestamp(&record.attributes.starts_at)?;
    let ends_at = parse_timestamp(&record.attributes.ends_at)?;
    check_order("event instance", &record.id, &starts_at, &ends_at)?;

    let sub_time_ids = record
        .relationships
        .event_times
        .as_ref()
        .map(|rel| rel.ids().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Occurrence {
        id: record.id.clone(),
        event_id: record.relationships.event.data.id.clone(),
        starts_at,
        ends_at,
        location: record.attributes.location.clone(),
        sub_time_ids,
    })
}

fn check_order(
    kind: &str,
    id: &str,
    starts_at: &chrono::DateTime<chrono::Utc>,
    ends_at: &chrono::DateTime<chrono::Utc>,
) -> CalNotifyResult<()> {
    if ends_at < starts_at {
        return Err(CalNotifyError::Feed(format!(
            "{} {} ends ({}) before it starts ({})",
            kind, id, ends_at, starts_at
        )));
    }
    Ok(())
}

impl OccurrenceIndex {
    pub fn events(&self) -> &HashMap<String, Event> {
        &self.events
    }

    pub fn sub_times(&self) -> &HashMap<String, SubTime> {
        &self.sub_times
    }

    /// The parent event of an occurrence. A dangling reference means the
    /// feed response was partial or malformed.
    pub fn event_for(&self, occurrence: &Occurrence) -> CalNotifyResult<&Event> {
        self.events
            .get(&occurrence.event_id)
            .ok_or_else(|| CalNotifyError::MissingReference {
                occurrence_id: occurrence.id.clone(),
                event_id: occurrence.event_id.clone(),
            })
    }

    /// Sub-times of an occurrence, in the order the occurrence lists them.
    pub fn sub_times_for(&self, occurrence: &Occurrence) -> Vec<&SubTime> {
        occurrence
            .sub_time_ids
            .iter()
            .filter_map(|id| {
                let sub_time = self.sub_times.get(id);
                if sub_time.is_none() {
                    tracing::warn!(
                        occurrence = %occurrence.id,
                        event_time = %id,
                        "event time not included in feed, skipping"
                    );
                }
                sub_time
            })
            .collect()
    }
}

/// A fully decoded feed: the index plus every occurrence, with all event
/// references checked up front so a bad feed aborts before anything is sent.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub index: OccurrenceIndex,
    pub occurrences: Vec<Occurrence>,
}

impl Schedule {
    pub fn from_feed(feed: &FeedDocument) -> CalNotifyResult<Self> {
        let index = build_index(feed)?;
        let occurrences = occurrences(feed).collect::<CalNotifyResult<Vec<_>>>()?;

        for occurrence in &occurrences {
            index.event_for(occurrence)?;
        }

        Ok(Schedule { index, occurrences })
    }

    pub fn event_for(&self, occurrence: &Occurrence) -> CalNotifyResult<&Event> {
        self.index.event_for(occurrence)
    }
}
