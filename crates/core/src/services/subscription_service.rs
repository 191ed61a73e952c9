use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::providers::traits::PushChannel;

/// What one reconciliation pass actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub left: Vec<String>,
    pub joined: Vec<String>,
    pub failed: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.left.is_empty() && self.joined.is_empty() && self.failed.is_empty()
    }
}

/// Keeps the push channel's group memberships equal to the visible symbols.
///
/// The desired set is always remembered, even while the channel is down, so
/// that a (re)connect can join exactly what is on screen. Leaves are issued
/// before joins. A failed join or leave is logged and skipped; the rest of
/// the batch still runs and nothing is retried until the next pass.
pub struct SubscriptionManager {
    channel: Arc<dyn PushChannel>,
    /// Visible symbols, uppercased, in display order.
    desired: Vec<String>,
    /// Groups we believe the server currently has us in.
    joined: BTreeSet<String>,
}

impl SubscriptionManager {
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        Self {
            channel,
            desired: Vec::new(),
            joined: BTreeSet::new(),
        }
    }

    /// Make the joined set match `symbols`. No-op (beyond remembering the
    /// target) while the channel is not connected.
    pub async fn set_visible(&mut self, symbols: &[String]) -> SyncReport {
        let mut desired: Vec<String> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let upper = symbol.trim().to_uppercase();
            if !upper.is_empty() && !desired.contains(&upper) {
                desired.push(upper);
            }
        }
        self.desired = desired;
        self.sync().await
    }

    /// The channel (re)connected: server-side groups are fresh, so re-join
    /// the whole visible set.
    pub async fn on_connected(&mut self) -> SyncReport {
        self.joined.clear();
        self.sync().await
    }

    /// The connection dropped and took its group memberships with it.
    pub fn on_disconnected(&mut self) {
        self.joined.clear();
    }

    pub fn joined(&self) -> &BTreeSet<String> {
        &self.joined
    }

    pub fn desired(&self) -> &[String] {
        &self.desired
    }

    async fn sync(&mut self) -> SyncReport {
        let mut report = SyncReport::default();

        if !self.channel.is_connected() {
            debug!(
                component = "subscriptions",
                event = "sync.deferred",
                channel = self.channel.name(),
                desired = self.desired.len()
            );
            return report;
        }

        let to_leave: Vec<String> = self
            .joined
            .iter()
            .filter(|s| !self.desired.contains(*s))
            .cloned()
            .collect();
        let to_join: Vec<String> = self
            .desired
            .iter()
            .filter(|s| !self.joined.contains(*s))
            .cloned()
            .collect();

        for symbol in to_leave {
            // Leaving is best effort: a stale push for a symbol that failed
            // to leave just updates a row nobody is looking at.
            self.joined.remove(&symbol);
            match self.channel.leave(&symbol).await {
                Ok(()) => report.left.push(symbol),
                Err(e) => {
                    warn!(
                        component = "subscriptions",
                        event = "leave.failed",
                        symbol = %symbol,
                        error = %e
                    );
                    report.failed.push(symbol);
                }
            }
        }

        for symbol in to_join {
            match self.channel.join(&symbol).await {
                Ok(()) => {
                    self.joined.insert(symbol.clone());
                    report.joined.push(symbol);
                }
                Err(e) => {
                    warn!(
                        component = "subscriptions",
                        event = "join.failed",
                        symbol = %symbol,
                        error = %e
                    );
                    report.failed.push(symbol);
                }
            }
        }

        if !report.is_noop() {
            debug!(
                component = "subscriptions",
                event = "sync.done",
                left = report.left.len(),
                joined = report.joined.len(),
                failed = report.failed.len()
            );
        }
        report
    }
}
