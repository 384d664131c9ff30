//! Lead-time rules and their contacts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Delivery channel for a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Sms,
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Channel::Email),
            "sms" => Ok(Channel::Sms),
            other => Err(format!("unknown contact type '{}'", other)),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Sms => write!(f, "sms"),
        }
    }
}

/// A notification target: an email address or an E.164 phone number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub channel: Channel,
    pub address: String,
}

impl Contact {
    pub fn email(address: impl Into<String>) -> Self {
        Contact {
            channel: Channel::Email,
            address: address.into(),
        }
    }

    pub fn sms(address: impl Into<String>) -> Self {
        Contact {
            channel: Channel::Sms,
            address: address.into(),
        }
    }
}

/// Notify `contacts` when an occurrence is `days_away` days out.
///
/// 0 means today; negative values look into the past.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyRule {
    pub days_away: i64,
    pub contacts: Vec<Contact>,
}

impl NotifyRule {
    pub fn new(days_away: i64, contacts: Vec<Contact>) -> Self {
        NotifyRule {
            days_away,
            contacts,
        }
    }
}

/// Rules keyed by `days_away`, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<NotifyRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. A rule for an offset that is already present replaces
    /// the earlier one in place.
    pub fn insert(&mut self, rule: NotifyRule) {
        match self.rules.iter_mut().find(|r| r.days_away == rule.days_away) {
            Some(existing) => {
                tracing::debug!(days_away = rule.days_away, "replacing duplicate notify group");
                *existing = rule;
            }
            None => self.rules.push(rule),
        }
    }

    pub fn get(&self, days_away: i64) -> Option<&NotifyRule> {
        self.rules.iter().find(|r| r.days_away == days_away)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NotifyRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<NotifyRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = NotifyRule>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a NotifyRule;
    type IntoIter = std::slice::Iter<'a, NotifyRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
