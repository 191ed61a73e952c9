use thiserror::Error;

/// Unified error type for the entire coin-dashboard-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// Per-item failures (a single join/leave, a malformed push frame) are
/// logged and swallowed by the services; only the snapshot load and the
/// detail fetch surface errors to their callers.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Snapshot / REST ─────────────────────────────────────────────
    #[error("Snapshot load failed: {0}")]
    SnapshotLoad(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Push channel ────────────────────────────────────────────────
    #[error("Subscription to {symbol} failed: {message}")]
    Subscription {
        symbol: String,
        message: String,
    },

    #[error("Push channel is not connected")]
    ChannelNotConnected,

    #[error("Hub protocol error: {0}")]
    Protocol(String),

    // ── Configuration / input ───────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors carry the full URL; keep query strings out of logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for CoreError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CoreError::Network(format!("WebSocket: {e}"))
    }
}
