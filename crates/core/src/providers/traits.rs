use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::models::coin::{AssetListing, PriceHistoryPoint};

/// Request/response side of the backend: the asset list and per-asset detail.
///
/// The REST implementation lives in `rest_api`; tests plug in in-memory ones.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Human-readable name of this source (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the full, ordered asset list (the snapshot).
    async fn fetch_assets(&self) -> Result<Vec<AssetListing>, CoreError>;

    /// Fetch a single asset's metadata by symbol.
    async fn fetch_asset(&self, symbol: &str) -> Result<AssetListing, CoreError>;

    /// Fetch price points for `symbol` recorded at or after `from`.
    async fn fetch_price_history(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, CoreError>;
}

/// Publish/subscribe side of the backend: named per-symbol groups.
///
/// Inbound messages do not flow through this trait; the implementation hands
/// them out as `ChannelEvent`s on its own receiver.
#[async_trait]
pub trait PushChannel: Send + Sync {
    fn name(&self) -> &str;

    /// Whether join/leave calls can currently reach the server.
    fn is_connected(&self) -> bool;

    /// Join the group for `symbol`; resolves once the server acknowledges it.
    async fn join(&self, symbol: &str) -> Result<(), CoreError>;

    /// Leave the group for `symbol`; resolves once the server acknowledges it.
    async fn leave(&self, symbol: &str) -> Result<(), CoreError>;

    /// Tear the connection down for good. Pending calls fail.
    async fn disconnect(&self);
}
