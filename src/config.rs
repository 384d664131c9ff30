//! Process configuration, resolved once from the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use calnotify_core::CalNotifyError;
use calnotify_core::config::NotifyConfig;
use calnotify_core::lead_time::Granularity;
use calnotify_core::rules::{Contact, NotifyRule, RuleSet};
use calnotify_core::time::parse_timezone;
use chrono_tz::Tz;

const DEFAULT_PER_PAGE: u32 = 25;

/// Offset used when rules come from the legacy TESTMAILTO/TESTSMSTO variables
const LEGACY_DAYS_AWAY: i64 = 1;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tz: Tz,
    pub lead_time: Granularity,
    /// Prepended to every subject line
    pub prefix: String,
    pub notify_config: PathBuf,
    /// Set when NOTIFYCONFIG names the file; the legacy rule is only a
    /// fallback for the default location
    pub notify_config_explicit: bool,
    pub feed: FeedSource,
    pub sinks: SinkConfig,
    pub test_mail_to: Option<String>,
    pub test_sms_to: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FeedSource {
    PlanningCenter(PlanningCenterConfig),
    /// A saved feed response, for dry runs and debugging
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PlanningCenterConfig {
    pub app_id: String,
    pub secret: String,
    pub tag_id: String,
    pub per_page: u32,
}

#[derive(Debug, Clone)]
pub enum SinkConfig {
    /// Test mode: nothing leaves the machine
    DryRun,
    Live {
        sendgrid: SendGridConfig,
        twilio: TwilioConfig,
    },
}

#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub mail_from: String,
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub messaging_service_sid: String,
}

impl AppConfig {
    /// Read the process environment. `.env` is loaded by `main` beforehand.
    pub fn from_env() -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_summary();
        Ok(config)
    }

    /// Resolve every setting through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| CalNotifyError::MissingConfig(key.to_string()))
        };

        let tz = parse_timezone(&require("TZ")?)?;

        let lead_time = match get("LEADTIME") {
            Some(mode) => mode
                .parse::<Granularity>()
                .map_err(|e| CalNotifyError::Config(format!("LEADTIME: {}", e)))?,
            None => Granularity::default(),
        };

        let test_mode = match get("TESTMODE") {
            Some(value) => parse_bool("TESTMODE", &value)?,
            None => false,
        };

        let (notify_config, notify_config_explicit) = match get("NOTIFYCONFIG") {
            Some(path) => (PathBuf::from(path), true),
            None => (default_notify_config_path()?, false),
        };

        let feed = match get("FEEDFILE") {
            Some(path) => FeedSource::File(PathBuf::from(path)),
            None => FeedSource::PlanningCenter(PlanningCenterConfig {
                app_id: require("PCOAPPID")?,
                secret: require("PCOSECRET")?,
                tag_id: require("PCOTAGID")?,
                per_page: match get("PCOPERPAGE") {
                    Some(n) => n.trim().parse().map_err(|_| {
                        CalNotifyError::Config(format!("PCOPERPAGE must be a number, got '{}'", n))
                    })?,
                    None => DEFAULT_PER_PAGE,
                },
            }),
        };

        let sinks = if test_mode {
            SinkConfig::DryRun
        } else {
            SinkConfig::Live {
                sendgrid: SendGridConfig {
                    api_key: require("SENDGRIDAPIKEY")?,
                    mail_from: require("MAILFROM")?,
                },
                twilio: TwilioConfig {
                    account_sid: require("TWILIOSID")?,
                    auth_token: require("TWILIOTOKEN")?,
                    messaging_service_sid: require("TWILIOSERVICESID")?,
                },
            }
        };

        Ok(AppConfig {
            tz,
            lead_time,
            prefix: lookup("PREFIX").unwrap_or_default(),
            notify_config,
            notify_config_explicit,
            feed,
            sinks,
            test_mail_to: get("TESTMAILTO"),
            test_sms_to: get("TESTSMSTO"),
        })
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self.sinks, SinkConfig::DryRun)
    }

    /// Load the notify groups.
    ///
    /// Without a config file, TESTMAILTO / TESTSMSTO (if set) become a
    /// single one-day-out rule, which is how the job was first deployed.
    /// A NOTIFYCONFIG path that does not exist is an error.
    pub fn load_rules(&self) -> Result<RuleSet> {
        if self.notify_config_explicit || self.notify_config.exists() {
            let config = NotifyConfig::load(&self.notify_config).with_context(|| {
                format!("Failed to load notify config at {}", self.notify_config.display())
            })?;
            return Ok(config.to_rules());
        }

        let mut contacts = Vec::new();
        if let Some(to) = &self.test_mail_to {
            contacts.push(Contact::email(to.clone()));
        }
        if let Some(to) = &self.test_sms_to {
            contacts.push(Contact::sms(to.clone()));
        }

        if contacts.is_empty() {
            anyhow::bail!(
                "Notify config not found at {}\n\n\
                Create it with one or more groups:\n\n\
                [[groups]]\n\
                days = 1\n\
                contacts = [{{ type = \"email\", to = \"you@example.com\" }}]\n\n\
                or point NOTIFYCONFIG at an existing file.",
                self.notify_config.display()
            );
        }

        tracing::info!(
            "no notify config at {}, using TESTMAILTO/TESTSMSTO",
            self.notify_config.display()
        );
        Ok(std::iter::once(NotifyRule::new(LEGACY_DAYS_AWAY, contacts)).collect())
    }

    fn log_summary(&self) {
        fn preview(val: &str) -> String {
            let head: String = val.chars().take(4).collect();
            format!("{}...({} chars)", head, val.chars().count())
        }

        tracing::info!("Config loaded:");
        tracing::info!("  TZ: {}", self.tz);
        tracing::info!("  LEADTIME: {}", self.lead_time);
        tracing::info!("  NOTIFYCONFIG: {}", self.notify_config.display());
        match &self.feed {
            FeedSource::PlanningCenter(pco) => {
                tracing::info!("  PCOAPPID: {}", preview(&pco.app_id));
                tracing::info!("  PCOTAGID: {}", pco.tag_id);
            }
            FeedSource::File(path) => tracing::info!("  FEEDFILE: {}", path.display()),
        }
        match &self.sinks {
            SinkConfig::DryRun => tracing::info!("  TESTMODE: on (nothing will be sent)"),
            SinkConfig::Live { sendgrid, twilio } => {
                tracing::info!("  SENDGRIDAPIKEY: {}", preview(&sendgrid.api_key));
                tracing::info!("  MAILFROM: {}", sendgrid.mail_from);
                tracing::info!("  TWILIOSID: {}", preview(&twilio.account_sid));
            }
        }
    }
}

fn default_notify_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("Could not determine config directory; set NOTIFYCONFIG")?;
    Ok(dir.join("calnotify").join("config.toml"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CalNotifyError::Config(format!("{} must be true or false, got '{}'", key, other)).into()),
    }
}

/// Read a saved feed response from disk.
pub fn read_feed_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read feed file at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calnotify_core::rules::Channel;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const LIVE: &[(&str, &str)] = &[
        ("TZ", "US/Central"),
        ("PCOAPPID", "app"),
        ("PCOSECRET", "secret"),
        ("PCOTAGID", "42"),
        ("SENDGRIDAPIKEY", "SG.key"),
        ("MAILFROM", "from@example.com"),
        ("TWILIOSID", "AC123"),
        ("TWILIOTOKEN", "token"),
        ("TWILIOSERVICESID", "MG123"),
        ("NOTIFYCONFIG", "/etc/calnotify.toml"),
    ];

    #[test]
    fn test_live_config() {
        let config = AppConfig::from_lookup(lookup(LIVE)).unwrap();

        assert_eq!(config.tz, chrono_tz::US::Central);
        assert_eq!(config.lead_time, Granularity::CalendarDay);
        assert_eq!(config.prefix, "");
        assert!(!config.is_dry_run());
        assert_eq!(config.notify_config, PathBuf::from("/etc/calnotify.toml"));
        let FeedSource::PlanningCenter(pco) = &config.feed else {
            panic!("expected the Planning Center feed");
        };
        assert_eq!(pco.tag_id, "42");
        assert_eq!(pco.per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn test_missing_required_value_is_named() {
        let vars: Vec<_> = LIVE.iter().copied().filter(|(k, _)| *k != "TWILIOTOKEN").collect();
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CalNotifyError>(),
            Some(CalNotifyError::MissingConfig(key)) if key == "TWILIOTOKEN"
        ));
    }

    #[test]
    fn test_test_mode_needs_no_sink_credentials() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TZ", "UTC"),
            ("TESTMODE", "yes"),
            ("FEEDFILE", "feed.json"),
            ("LEADTIME", "window"),
            ("PREFIX", "[Test] "),
            ("NOTIFYCONFIG", "groups.toml"),
        ]))
        .unwrap();

        assert!(config.is_dry_run());
        assert!(matches!(config.feed, FeedSource::File(_)));
        assert_eq!(config.lead_time, Granularity::Window);
        assert_eq!(config.prefix, "[Test] ");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut vars = LIVE.to_vec();
        vars.push(("PCOPERPAGE", "lots"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = LIVE.to_vec();
        vars.push(("TESTMODE", "maybe"));
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = LIVE.to_vec();
        vars[0] = ("TZ", "Nowhere/Special");
        assert!(AppConfig::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_legacy_rule_without_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.toml");
        let mut vars = LIVE.to_vec();
        vars.push(("TESTMAILTO", "test@example.com"));
        vars.push(("TESTSMSTO", "+15551234567"));
        let mut config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        // stand in for the default location
        config.notify_config = missing;
        config.notify_config_explicit = false;

        let rules = config.load_rules().unwrap();
        let rule = rules.get(LEGACY_DAYS_AWAY).unwrap();
        assert_eq!(rule.contacts.len(), 2);
        assert_eq!(rule.contacts[1].channel, Channel::Sms);
    }

    #[test]
    fn test_rules_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[[groups]]\ndays = 3\ncontacts = [{ type = \"email\", to = \"a@example.com\" }]\n",
        )
        .unwrap();

        let mut config = AppConfig::from_lookup(lookup(LIVE)).unwrap();
        config.notify_config = path;

        let rules = config.load_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.get(3).is_some());
    }

    #[test]
    fn test_no_rules_anywhere_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::from_lookup(lookup(LIVE)).unwrap();
        config.notify_config = dir.path().join("missing.toml");
        config.notify_config_explicit = false;

        assert!(config.load_rules().is_err());
    }

    #[test]
    fn test_missing_explicit_config_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let mut vars = LIVE.to_vec();
        vars.retain(|(k, _)| *k != "NOTIFYCONFIG");
        vars.push(("NOTIFYCONFIG", missing.to_str().unwrap()));
        vars.push(("TESTMAILTO", "test@example.com"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();

        assert!(config.notify_config_explicit);
        let err = config.load_rules().unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
