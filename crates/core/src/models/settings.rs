use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::view::DEFAULT_ITEMS_PER_PAGE;

const DEFAULT_API_URL: &str = "https://localhost:7175";

/// Runtime settings for the dashboard and its backend collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSettings {
    /// Backend base URL, without a trailing slash (e.g., "https://localhost:7175").
    pub api_url: String,

    /// Path of the price hub relative to `api_url`.
    pub price_hub_path: String,

    /// Path of the global metrics hub relative to `api_url`.
    pub metrics_hub_path: String,

    pub items_per_page: usize,

    /// How long a row stays flashed after a price change.
    pub highlight_window_ms: u64,

    /// Delay before each reconnect attempt; the channel gives up once they run out.
    pub reconnect_delays_ms: Vec<u64>,

    pub request_timeout_secs: u64,

    /// How long a join/leave invocation may wait for its completion.
    pub invoke_timeout_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            price_hub_path: "/pricehub".to_string(),
            metrics_hub_path: "/globalmetrichub".to_string(),
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            highlight_window_ms: 1500,
            reconnect_delays_ms: vec![0, 2000, 5000, 10000],
            request_timeout_secs: 30,
            invoke_timeout_secs: 10,
        }
    }
}

impl DashboardSettings {
    /// Defaults overlaid with `COIN_DASH_*` environment variables.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let mut settings = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(url) = get("COIN_DASH_API_URL") {
            settings.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = get("COIN_DASH_PAGE_SIZE") {
            settings.items_per_page = raw.parse().map_err(|_| {
                CoreError::InvalidConfig(format!("COIN_DASH_PAGE_SIZE must be a number, got '{raw}'"))
            })?;
        }
        if let Some(raw) = get("COIN_DASH_HIGHLIGHT_MS") {
            settings.highlight_window_ms = raw.parse().map_err(|_| {
                CoreError::InvalidConfig(format!("COIN_DASH_HIGHLIGHT_MS must be a number, got '{raw}'"))
            })?;
        }
        if let Some(raw) = get("COIN_DASH_RECONNECT_MS") {
            settings.reconnect_delays_ms = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u64>().map_err(|_| {
                        CoreError::InvalidConfig(format!(
                            "COIN_DASH_RECONNECT_MS must be a comma-separated list of numbers, got '{raw}'"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.api_url.trim().is_empty() {
            return Err(CoreError::InvalidConfig("api_url must not be empty".into()));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(CoreError::InvalidConfig(format!(
                "api_url must start with http:// or https://, got '{}'",
                self.api_url
            )));
        }
        if self.items_per_page == 0 {
            return Err(CoreError::InvalidConfig("items_per_page must be at least 1".into()));
        }
        Ok(())
    }

    pub fn price_hub_url(&self) -> String {
        join_url(&self.api_url, &self.price_hub_path)
    }

    pub fn metrics_hub_url(&self) -> String {
        join_url(&self.api_url, &self.metrics_hub_path)
    }

    pub fn highlight_window(&self) -> Duration {
        Duration::from_millis(self.highlight_window_ms)
    }

    pub fn reconnect_delays(&self) -> Vec<Duration> {
        self.reconnect_delays_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.invoke_timeout_secs)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
