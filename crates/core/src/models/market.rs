use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::wire;
use crate::services::format_service::format_whole_usd;

/// Raw global market metrics pushed on the metrics hub (`ReceiveGlobalMetric`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlobalMetricUpdate {
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub total_market_cap_usd: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub total_market_cap_percent_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub fear_and_greed_index: Option<f64>,
    #[serde(default)]
    pub fear_and_greed_text: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub total_volume_24h: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub total_volume_24h_percent_change_24h: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub bitcoin_dominance_price: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub ethereum_dominance_price: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub bitcoin_dominance_percentage: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub ethereum_dominance_percentage: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub altcoin_season_score: Option<f64>,
}

impl GlobalMetricUpdate {
    /// Decode the `ReceiveGlobalMetric` argument, shaped `{ "data": { … } }`.
    pub fn from_message(message: &Value) -> Option<Self> {
        let data = message.get("data")?;
        if !data.is_object() {
            return None;
        }
        serde_json::from_value(data.clone()).ok()
    }
}

/// Display-ready market overview strip.
///
/// Percent-style fields are fractions (`0.0123` for 1.23%), as the
/// backend sends them multiplied by 100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketOverview {
    pub total_market_cap: String,
    pub total_market_cap_change_24h: f64,
    pub fear_greed_index: f64,
    pub fear_greed_text: String,
    pub total_volume_24h: String,
    pub total_volume_24h_change: f64,
    pub btc_dominance: f64,
    pub eth_dominance: f64,
    pub btc_dominance_percent: f64,
    pub eth_dominance_percent: f64,
    pub altcoin_season_index: f64,
}

impl From<&GlobalMetricUpdate> for MarketOverview {
    fn from(m: &GlobalMetricUpdate) -> Self {
        let fraction = |v: Option<f64>| v.unwrap_or(0.0) / 100.0;
        Self {
            total_market_cap: format_whole_usd(m.total_market_cap_usd.unwrap_or(0.0)),
            total_market_cap_change_24h: fraction(m.total_market_cap_percent_change_24h),
            fear_greed_index: m.fear_and_greed_index.unwrap_or(0.0),
            fear_greed_text: m.fear_and_greed_text.clone().unwrap_or_default(),
            total_volume_24h: format_whole_usd(m.total_volume_24h.unwrap_or(0.0)),
            total_volume_24h_change: fraction(m.total_volume_24h_percent_change_24h),
            btc_dominance: fraction(m.bitcoin_dominance_price),
            eth_dominance: fraction(m.ethereum_dominance_price),
            btc_dominance_percent: fraction(m.bitcoin_dominance_percentage),
            eth_dominance_percent: fraction(m.ethereum_dominance_percentage),
            altcoin_season_index: m.altcoin_season_score.unwrap_or(0.0),
        }
    }
}
