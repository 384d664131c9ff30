//! Notify-group configuration file.
//!
//! ```toml
//! [[groups]]
//! days = 1
//! contacts = [
//!   { type = "email", to = "office@example.com" },
//!   { type = "sms", to = "+15551234567" },
//! ]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CalNotifyError, CalNotifyResult};
use crate::rules::{Channel, Contact, NotifyRule, RuleSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub days: i64,
    #[serde(default)]
    pub contacts: Vec<ContactConfig>,
}

/// A contact as written in the file. `type` stays a string here so an
/// unrecognised channel can be skipped instead of rejecting the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub to: String,
}

impl NotifyConfig {
    /// Load from a TOML file, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> CalNotifyResult<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|e| e == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> CalNotifyResult<Self> {
        toml::from_str(content).map_err(|e| CalNotifyError::Config(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> CalNotifyResult<Self> {
        serde_json::from_str(content).map_err(|e| CalNotifyError::Config(e.to_string()))
    }

    /// Convert into typed rules, dropping contacts with unknown channels.
    pub fn to_rules(&self) -> RuleSet {
        self.groups
            .iter()
            .map(|group| {
                let contacts = group
                    .contacts
                    .iter()
                    .filter_map(|c| match c.kind.parse::<Channel>() {
                        Ok(channel) => Some(Contact {
                            channel,
                            address: c.to.clone(),
                        }),
                        Err(e) => {
                            tracing::warn!(days = group.days, to = %c.to, "skipping contact: {}", e);
                            None
                        }
                    })
                    .collect();
                NotifyRule::new(group.days, contacts)
            })
            .collect()
    }
}
