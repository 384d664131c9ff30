//! Wire types for the upcoming-events feed.
//!
//! The feed is a JSON:API document: a primary `data` list of event
//! instances and an `included` list of heterogeneous records tagged by
//! `type`. Records are decoded into a tagged enum here; conversion into
//! the typed model happens in [`crate::index`].

use serde::Deserialize;

use crate::error::{CalNotifyError, CalNotifyResult};

#[derive(Debug, Clone, Deserialize)]
pub struct FeedDocument {
    pub data: Vec<InstanceRecord>,
    #[serde(default)]
    pub included: Vec<IncludedRecord>,
}

impl FeedDocument {
    pub fn from_json(json: &str) -> CalNotifyResult<Self> {
        serde_json::from_str(json).map_err(|e| CalNotifyError::Feed(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> CalNotifyResult<Self> {
        serde_json::from_value(value).map_err(|e| CalNotifyError::Feed(e.to_string()))
    }
}

/// A primary record: one occurrence of an event.
#[derive(Debug, Clone, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub attributes: InstanceAttributes,
    pub relationships: InstanceRelationships,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceAttributes {
    pub starts_at: String,
    pub ends_at: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceRelationships {
    pub event: ToOne,
    #[serde(default)]
    pub event_times: Option<ToMany>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToOne {
    pub data: ResourceRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToMany {
    #[serde(default)]
    pub data: Option<Vec<ResourceRef>>,
}

impl ToMany {
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.data.iter().flatten().map(|r| r.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// A record from the `included` list.
///
/// Types this crate does not use (tags, resources, owners...) decode to
/// [`IncludedRecord::Unknown`] and are dropped by the index.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum IncludedRecord {
    Event {
        id: String,
        attributes: EventAttributes,
    },
    EventTime {
        id: String,
        attributes: EventTimeAttributes,
        #[serde(default)]
        relationships: Option<EventTimeRelationships>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventAttributes {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventTimeAttributes {
    pub starts_at: String,
    pub ends_at: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub visible_on_widget_and_ical: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTimeRelationships {
    #[serde(default)]
    pub event_instance: Option<ToOne>,
}
