use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::wire;
use crate::services::format_service::{
    format_percent, format_price, format_supply, format_whole_usd,
};

/// Transient flash state of a row after a live price change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighlightClass {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "flash-up")]
    FlashUp,
    #[serde(rename = "flash-down")]
    FlashDown,
}

impl HighlightClass {
    /// CSS class name; empty when not highlighted.
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightClass::None => "",
            HighlightClass::FlashUp => "flash-up",
            HighlightClass::FlashDown => "flash-down",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, HighlightClass::None)
    }
}

impl std::fmt::Display for HighlightClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asset as returned by the snapshot endpoint (`GET /api/Asset`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetListing {
    #[serde(default, deserialize_with = "wire::opt_string_or_number")]
    pub id: Option<String>,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_lenient_u32")]
    pub rank: Option<u32>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub date_add: Option<DateTime<Utc>>,
}

impl AssetListing {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One row of the dashboard.
///
/// Market fields are display strings; the raw numbers only exist while a
/// snapshot or push update is being formatted. Identity fields (`id`,
/// `symbol`, `name`) never change after the record is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinRecord {
    pub id: String,
    /// Uppercased ticker, unique within the registry.
    pub symbol: String,
    pub name: String,
    pub description: Option<String>,
    pub logo_url: Option<String>,

    pub price: String,
    pub change_1h: String,
    pub change_24h: String,
    pub change_7d: String,
    pub market_cap: String,
    pub volume: String,
    pub supply: String,

    pub is_positive_1h: bool,
    pub is_positive_24h: bool,
    pub is_positive_7d: bool,

    pub highlight: HighlightClass,

    // Sort/filter-only fields
    pub rank: Option<u32>,
    pub network: Option<String>,
    pub view_count: Option<u64>,
    pub date_add: Option<DateTime<Utc>>,
}

impl CoinRecord {
    /// Build a fresh row from a snapshot listing. Market fields start at zero
    /// and every direction flag starts positive until the first push arrives.
    pub fn from_listing(listing: AssetListing) -> Self {
        let symbol = listing.symbol.trim().to_uppercase();
        Self {
            id: listing.id.unwrap_or_else(|| symbol.clone()),
            name: listing.name,
            description: listing.description,
            logo_url: listing.logo_url,
            price: format_price(0.0),
            change_1h: format_percent(0.0),
            change_24h: format_percent(0.0),
            change_7d: format_percent(0.0),
            market_cap: format_whole_usd(0.0),
            volume: format_whole_usd(0.0),
            supply: format_supply(0.0, &symbol),
            is_positive_1h: true,
            is_positive_24h: true,
            is_positive_7d: true,
            highlight: HighlightClass::None,
            rank: listing.rank,
            network: listing.network,
            view_count: listing.view_count,
            date_add: listing.date_add,
            symbol,
        }
    }
}

/// One point of `GET /api/Prices/{symbol}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryPoint {
    #[serde(default, deserialize_with = "wire::opt_timestamp")]
    pub timestamp_utc: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub percent_change_1h: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub percent_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub percent_change_7d: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub supply: Option<f64>,
}

/// A headline figure with its 24h change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsItem {
    pub value: String,
    pub change: String,
    pub is_positive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinStats {
    pub market_cap: StatsItem,
    pub volume_24h: StatsItem,
    pub volume_market_cap_ratio: String,
    pub max_supply: String,
    pub circulating_supply: String,
    pub total_supply: String,
}

/// One-off detail view for a single coin, outside the live loop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinDetail {
    pub coin: CoinRecord,
    pub stats: CoinStats,
}
