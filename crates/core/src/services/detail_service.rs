use chrono::{Duration, Utc};

use crate::errors::CoreError;
use crate::models::coin::{
    AssetListing, CoinDetail, CoinRecord, CoinStats, PriceHistoryPoint, StatsItem,
};
use crate::providers::traits::AssetSource;
use crate::services::format_service::{
    format_percent, format_price, format_supply, format_whole_usd,
};

/// Builds the one-off coin detail view from an asset and its recent price history.
///
/// Pure business logic apart from [`fetch`](Self::fetch), which pulls both
/// inputs from an [`AssetSource`].
pub struct DetailService;

impl DetailService {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the asset and its last 24h of prices concurrently, then build
    /// the detail. Either request failing fails the whole fetch.
    pub async fn fetch(
        &self,
        source: &dyn AssetSource,
        symbol: &str,
    ) -> Result<CoinDetail, CoreError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(CoreError::ValidationError("symbol must not be empty".into()));
        }
        let since = Utc::now() - Duration::hours(24);
        let (asset, history) = tokio::try_join!(
            source.fetch_asset(symbol),
            source.fetch_price_history(symbol, since),
        )?;
        Ok(self.build(asset, &history))
    }

    /// Format the latest history point (by timestamp) onto a fresh record.
    /// With no history every market figure is zero.
    pub fn build(&self, asset: AssetListing, history: &[PriceHistoryPoint]) -> CoinDetail {
        let latest = history
            .iter()
            .max_by_key(|p| p.timestamp_utc.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN));

        let field = |f: fn(&PriceHistoryPoint) -> Option<f64>| latest.and_then(f).unwrap_or(0.0);
        let price = field(|p| p.price);
        let market_cap = field(|p| p.market_cap);
        let volume = field(|p| p.volume);
        let change_1h = field(|p| p.percent_change_1h);
        let change_24h = field(|p| p.percent_change_24h);
        let change_7d = field(|p| p.percent_change_7d);
        let supply = field(|p| p.supply);

        let mut coin = CoinRecord::from_listing(asset);
        coin.price = format_price(price);
        coin.change_1h = format_percent(change_1h);
        coin.change_24h = format_percent(change_24h);
        coin.change_7d = format_percent(change_7d);
        coin.market_cap = format_whole_usd(market_cap);
        coin.volume = format_whole_usd(volume);
        coin.supply = format_supply(supply, &coin.symbol);
        coin.is_positive_1h = change_1h >= 0.0;
        coin.is_positive_24h = change_24h >= 0.0;
        coin.is_positive_7d = change_7d >= 0.0;

        let ratio = if market_cap > 0.0 {
            volume / market_cap * 100.0
        } else {
            0.0
        };

        let stats = CoinStats {
            market_cap: StatsItem {
                value: coin.market_cap.clone(),
                change: coin.change_24h.clone(),
                is_positive: coin.is_positive_24h,
            },
            volume_24h: StatsItem {
                value: coin.volume.clone(),
                change: coin.change_24h.clone(),
                is_positive: coin.is_positive_24h,
            },
            volume_market_cap_ratio: format!("{ratio:.2}%"),
            max_supply: coin.supply.clone(),
            circulating_supply: coin.supply.clone(),
            total_supply: coin.supply.clone(),
        };

        CoinDetail { coin, stats }
    }
}

impl Default for DetailService {
    fn default() -> Self {
        Self::new()
    }
}
