use serde::Deserialize;
use serde_json::Value;

use super::market::GlobalMetricUpdate;
use super::wire;

/// A live price push for one asset.
///
/// Every market field is optional: a field missing from the payload leaves
/// the matching registry field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    pub asset: String,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, rename = "change1h", deserialize_with = "wire::opt_lenient_f64")]
    pub change_1h: Option<f64>,
    #[serde(default, rename = "change24h", deserialize_with = "wire::opt_lenient_f64")]
    pub change_24h: Option<f64>,
    #[serde(default, rename = "change7d", deserialize_with = "wire::opt_lenient_f64")]
    pub change_7d: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub market_cap: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "wire::opt_lenient_f64")]
    pub supply: Option<f64>,
}

impl PriceUpdate {
    /// An update carrying only a price.
    pub fn price(asset: impl Into<String>, price: f64) -> Self {
        Self {
            asset: asset.into(),
            price: Some(price),
            ..Self::default()
        }
    }

    /// Decode the `ReceiveMessage` argument, shaped `{ "data": { "asset": … } }`.
    ///
    /// Returns `None` for anything without a usable `asset`; such messages
    /// are dropped by the caller.
    pub fn from_message(message: &Value) -> Option<Self> {
        let data = message.get("data")?;
        let update: PriceUpdate = serde_json::from_value(data.clone()).ok()?;
        if update.asset.trim().is_empty() {
            return None;
        }
        Some(update)
    }

    /// Fold a later push for the same asset into this one. Fields the later
    /// push carries win; fields it leaves out keep their earlier value.
    pub fn merge_newer(&mut self, newer: PriceUpdate) {
        let PriceUpdate {
            asset: _,
            price,
            change_1h,
            change_24h,
            change_7d,
            market_cap,
            volume,
            supply,
        } = newer;
        self.price = price.or(self.price);
        self.change_1h = change_1h.or(self.change_1h);
        self.change_24h = change_24h.or(self.change_24h);
        self.change_7d = change_7d.or(self.change_7d);
        self.market_cap = market_cap.or(self.market_cap);
        self.volume = volume.or(self.volume);
        self.supply = supply.or(self.supply);
    }
}

/// Everything the push channel can deliver to the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// First successful connection.
    Connected,
    /// Connection re-established after a drop; group memberships are gone.
    Reconnected,
    /// Connection lost; a reconnect may follow.
    Disconnected { reason: String },
    /// The channel gave up (or was stopped) and will not reconnect.
    Closed,
    Price(PriceUpdate),
    GlobalMetric(GlobalMetricUpdate),
}
