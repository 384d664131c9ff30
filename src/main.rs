//! calnotify - emails and texts reminders for upcoming events.
//!
//! Meant to be run once per invocation by an external scheduler. All
//! settings come from the environment (or a `.env` file); the notify groups
//! come from a TOML file, see `NOTIFYCONFIG`.

mod config;
mod planning_center;
mod sinks;

use anyhow::Result;
use calnotify_core::feed::FeedDocument;
use calnotify_core::run::{RunOptions, run};
use calnotify_core::time::Clock;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, FeedSource};
use planning_center::PlanningCenterClient;

const DEFAULT_LOG_FILTER: &str = "calnotify=info,calnotify_core=info";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;
    let rules = config.load_rules()?;
    if rules.is_empty() {
        tracing::warn!("No notify groups configured, nothing will be sent");
    }

    let feed = load_feed(&config.feed).await?;
    let notifier = sinks::build_notifier(&config.sinks)?;

    let options = RunOptions {
        clock: Clock::system(config.tz),
        granularity: config.lead_time,
        prefix: config.prefix.clone(),
    };

    let summary = run(&feed, &rules, &options, notifier.as_ref()).await?;

    tracing::info!(
        occurrences = summary.occurrences,
        matches = summary.matches,
        sent = summary.sent,
        failed = summary.failed,
        dry_run = config.is_dry_run(),
        "Run complete"
    );
    if summary.failed > 0 {
        tracing::warn!("{} notification(s) could not be delivered", summary.failed);
    }

    Ok(())
}

async fn load_feed(source: &FeedSource) -> Result<FeedDocument> {
    match source {
        FeedSource::PlanningCenter(pco) => PlanningCenterClient::new(pco.clone())?.fetch_feed().await,
        FeedSource::File(path) => {
            let json = config::read_feed_file(path)?;
            Ok(FeedDocument::from_json(&json)?)
        }
    }
}
