//! Planning Center Resources API client (event instances feed).

use std::time::Duration;

use anyhow::{Context, Result};
use calnotify_core::feed::FeedDocument;

use crate::config::PlanningCenterConfig;

const API_BASE: &str = "https://api.planningcenteronline.com";
const EVENT_INSTANCES_PATH: &str = "/resources/v2/event_instances";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PlanningCenterClient {
    client: reqwest::Client,
    config: PlanningCenterConfig,
}

impl PlanningCenterClient {
    pub fn new(config: PlanningCenterConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("calnotify/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    /// Fetch upcoming instances for the configured tag, with their events
    /// and event times included.
    pub async fn fetch_feed(&self) -> Result<FeedDocument> {
        let url = format!("{}{}", API_BASE, EVENT_INSTANCES_PATH);

        let response = self
            .client
            .get(&url)
            .query(&query_params(&self.config))
            .basic_auth(&self.config.app_id, Some(&self.config.secret))
            .send()
            .await
            .context("Failed to reach Planning Center")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read Planning Center response")?;

        if !status.is_success() {
            anyhow::bail!("Planning Center returned {}: {}", status, body);
        }

        let feed = FeedDocument::from_json(&body).context("Failed to parse Planning Center response")?;
        tracing::debug!(
            instances = feed.data.len(),
            included = feed.included.len(),
            "fetched event instances"
        );
        Ok(feed)
    }
}

fn query_params(config: &PlanningCenterConfig) -> Vec<(&'static str, String)> {
    vec![
        ("filter", "future".to_string()),
        ("order", "starts_at".to_string()),
        ("include", "event,event_times".to_string()),
        ("where[tag_ids]", config.tag_id.clone()),
        ("per_page", config.per_page.to_string()),
    ]
}
