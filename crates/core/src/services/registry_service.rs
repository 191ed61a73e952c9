use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::models::coin::{AssetListing, CoinRecord, HighlightClass};
use crate::models::update::PriceUpdate;
use crate::services::format_service::{
    format_percent, format_price, format_supply, format_whole_usd, parse_numeric,
};

/// Read-only view of the registry handed to observers.
pub type CoinSnapshot = Arc<[CoinRecord]>;

/// The authoritative in-memory list of coins, keyed by uppercased symbol.
///
/// Two writers feed it: [`load_snapshot`](Self::load_snapshot) replaces the
/// whole list, [`apply_update`](Self::apply_update) merges one push. Every
/// mutation publishes the full list to subscribers.
///
/// Highlight expiry is deadline based: the registry records when each flash
/// should end and the owner calls [`expire_highlights`](Self::expire_highlights)
/// at or after [`next_highlight_deadline`](Self::next_highlight_deadline).
/// No task is spawned per update.
pub struct CoinRegistry {
    coins: Vec<CoinRecord>,
    /// Uppercased symbol → position in `coins`.
    index: HashMap<String, usize>,
    highlight_deadlines: HashMap<String, Instant>,
    highlight_window: Duration,
    publisher: watch::Sender<CoinSnapshot>,
}

impl std::fmt::Debug for CoinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoinRegistry")
            .field("coins", &self.coins.len())
            .field("pending_highlights", &self.highlight_deadlines.len())
            .field("highlight_window", &self.highlight_window)
            .finish()
    }
}

impl CoinRegistry {
    pub fn new(highlight_window: Duration) -> Self {
        let (publisher, _) = watch::channel(CoinSnapshot::from(Vec::new()));
        Self {
            coins: Vec::new(),
            index: HashMap::new(),
            highlight_deadlines: HashMap::new(),
            highlight_window,
            publisher,
        }
    }

    /// Replace the whole registry with a fresh snapshot.
    ///
    /// Order is preserved. A symbol listed twice keeps its first occurrence.
    /// Pending highlights are discarded.
    pub fn load_snapshot(&mut self, listings: Vec<AssetListing>) {
        let mut coins = Vec::with_capacity(listings.len());
        let mut index = HashMap::with_capacity(listings.len());

        for listing in listings {
            let record = CoinRecord::from_listing(listing);
            if record.symbol.is_empty() {
                debug!(component = "registry", event = "snapshot.skip_empty_symbol", id = %record.id);
                continue;
            }
            if index.contains_key(&record.symbol) {
                debug!(
                    component = "registry",
                    event = "snapshot.duplicate_symbol",
                    symbol = %record.symbol
                );
                continue;
            }
            index.insert(record.symbol.clone(), coins.len());
            coins.push(record);
        }

        info!(component = "registry", event = "snapshot.loaded", coins = coins.len());
        self.coins = coins;
        self.index = index;
        self.highlight_deadlines.clear();
        self.publish();
    }

    /// Merge one live push into the matching record.
    ///
    /// Returns `false` (and changes nothing) when the symbol is unknown.
    /// Fields present in the push overwrite the record; absent ones are kept.
    /// A price move flashes the row up or down and (re)starts its highlight
    /// window; an unchanged price leaves the current highlight alone.
    pub fn apply_update(&mut self, update: &PriceUpdate) -> bool {
        let symbol = update.asset.trim().to_uppercase();
        let Some(&idx) = self.index.get(&symbol) else {
            debug!(component = "registry", event = "update.unknown_symbol", symbol = %symbol);
            return false;
        };

        let coin = &mut self.coins[idx];
        let mut flash = None;

        if let Some(new_price) = update.price {
            let old_price = parse_numeric(&coin.price);
            coin.price = format_price(new_price);
            if new_price > old_price {
                flash = Some(HighlightClass::FlashUp);
            } else if new_price < old_price {
                flash = Some(HighlightClass::FlashDown);
            }
        }
        if let Some(change) = update.change_1h {
            coin.change_1h = format_percent(change);
            coin.is_positive_1h = change >= 0.0;
        }
        if let Some(change) = update.change_24h {
            coin.change_24h = format_percent(change);
            coin.is_positive_24h = change >= 0.0;
        }
        if let Some(change) = update.change_7d {
            coin.change_7d = format_percent(change);
            coin.is_positive_7d = change >= 0.0;
        }
        if let Some(market_cap) = update.market_cap {
            coin.market_cap = format_whole_usd(market_cap);
        }
        if let Some(volume) = update.volume {
            coin.volume = format_whole_usd(volume);
        }
        if let Some(supply) = update.supply {
            coin.supply = format_supply(supply, &coin.symbol);
        }

        if let Some(class) = flash {
            coin.highlight = class;
            self.highlight_deadlines
                .insert(symbol, Instant::now() + self.highlight_window);
        }

        self.publish();
        true
    }

    /// Clear every highlight whose window has elapsed. Returns how many were cleared.
    pub fn expire_highlights(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<String> = self
            .highlight_deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(symbol, _)| symbol.clone())
            .collect();

        for symbol in &expired {
            self.highlight_deadlines.remove(symbol);
            if let Some(&idx) = self.index.get(symbol) {
                self.coins[idx].highlight = HighlightClass::None;
            }
        }

        if !expired.is_empty() {
            self.publish();
        }
        expired.len()
    }

    /// Earliest pending highlight expiry, if any row is flashed.
    pub fn next_highlight_deadline(&self) -> Option<Instant> {
        self.highlight_deadlines.values().min().copied()
    }

    /// Drop all pending highlight timers and un-flash every row.
    pub fn clear_highlights(&mut self) {
        let had_pending = !self.highlight_deadlines.is_empty();
        self.highlight_deadlines.clear();
        for coin in &mut self.coins {
            coin.highlight = HighlightClass::None;
        }
        if had_pending {
            self.publish();
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, symbol: &str) -> Option<&CoinRecord> {
        self.index
            .get(&symbol.trim().to_uppercase())
            .map(|&idx| &self.coins[idx])
    }

    pub fn coins(&self) -> &[CoinRecord] {
        &self.coins
    }

    /// The most recently published list.
    pub fn snapshot(&self) -> CoinSnapshot {
        self.publisher.borrow().clone()
    }

    /// Observe every future mutation. The receiver starts at the current list.
    pub fn subscribe(&self) -> watch::Receiver<CoinSnapshot> {
        self.publisher.subscribe()
    }

    pub fn len(&self) -> usize {
        self.coins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }

    fn publish(&self) {
        self.publisher.send_replace(CoinSnapshot::from(self.coins.clone()));
    }
}
