//! Logging setup for the dashboard binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job.

use std::str::FromStr;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::settings::DashboardSettings;

/// Transport crates log every frame at debug; keep them quiet unless the
/// level directive names them.
const DEFAULT_DIRECTIVES: &str = "info,tungstenite=warn,tokio_tungstenite=warn,hyper_util=warn,reqwest=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive string, e.g. `debug` or `info,coin_dashboard_core=trace`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_DIRECTIVES.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Reads `COIN_DASH_LOG_LEVEL` and `COIN_DASH_LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// A bad format value keeps the default instead of failing startup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(level) = lookup("COIN_DASH_LOG_LEVEL").filter(|l| !l.trim().is_empty()) {
            config.filter = level.trim().to_string();
        }
        if let Some(format) = lookup("COIN_DASH_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            config.format = format;
        }
        config
    }

    /// The configured directives, or the defaults when they do not parse.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_ansi(config.format == LogFormat::Pretty);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
}

pub fn log_app_start(config: &LoggingConfig, settings: &DashboardSettings) {
    info!(
        component = "coin_dashboard",
        event = "app.start",
        api_url = %settings.api_url,
        price_hub = %settings.price_hub_url(),
        metrics_hub = %settings.metrics_hub_url(),
        page_size = settings.items_per_page,
        log_filter = %config.filter,
        log_format = ?config.format
    );
}
