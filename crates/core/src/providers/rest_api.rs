use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::traits::AssetSource;
use crate::errors::CoreError;
use crate::models::coin::{AssetListing, PriceHistoryPoint};
use crate::models::settings::DashboardSettings;

const PROVIDER: &str = "DashboardApi";

/// REST client for the dashboard backend.
///
/// - `GET /api/Asset` → the snapshot list
/// - `GET /api/Asset/{symbol}` → one asset
/// - `GET /api/Prices/{symbol}?from={iso8601}` → price history
pub struct RestAssetSource {
    client: Client,
    base_url: String,
    base: Url,
}

impl RestAssetSource {
    pub fn new(settings: &DashboardSettings) -> Result<Self, CoreError> {
        settings.validate()?;
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| CoreError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;
        let base_url = settings.api_url.trim_end_matches('/').to_string();
        let base = Url::parse(&base_url)
            .map_err(|e| CoreError::InvalidConfig(format!("api_url '{base_url}' is not a URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(CoreError::InvalidConfig(format!(
                "api_url '{base_url}' cannot carry a path"
            )));
        }
        Ok(Self {
            client,
            base_url,
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `base_url` plus `segments`, each percent-encoded as one path segment,
    /// so a symbol like `A/B` cannot reach another route.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        what: &str,
    ) -> Result<Option<T>, CoreError> {
        debug!(component = "rest_api", event = "request", url = %url);
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("{what} returned HTTP {status}"),
            });
        }

        let body = resp.json::<T>().await.map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse {what}: {e}"),
        })?;
        Ok(Some(body))
    }
}

#[async_trait]
impl AssetSource for RestAssetSource {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn fetch_assets(&self) -> Result<Vec<AssetListing>, CoreError> {
        let url = self.endpoint(&["api", "Asset"]);
        self.get_json::<Vec<AssetListing>>(url, "asset list")
            .await?
            .ok_or_else(|| CoreError::Api {
                provider: PROVIDER.into(),
                message: "asset list endpoint not found".into(),
            })
    }

    async fn fetch_asset(&self, symbol: &str) -> Result<AssetListing, CoreError> {
        let url = self.endpoint(&["api", "Asset", symbol]);
        self.get_json::<Option<AssetListing>>(url, "asset")
            .await?
            .flatten()
            .ok_or_else(|| CoreError::AssetNotFound(symbol.to_string()))
    }

    async fn fetch_price_history(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, CoreError> {
        let url = self.endpoint(&["api", "Prices", symbol]);
        let from = from.to_rfc3339_opts(SecondsFormat::Millis, true);
        debug!(component = "rest_api", event = "request", url = %url, from = %from);

        let resp = self
            .client
            .get(url)
            .query(&[("from", from.as_str())])
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("price history for {symbol} returned HTTP {status}"),
            });
        }
        resp.json::<Vec<PriceHistoryPoint>>()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse price history for {symbol}: {e}"),
            })
    }
}
