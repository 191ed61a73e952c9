pub mod errors;
pub mod models;
pub mod observability;
pub mod providers;
pub mod services;

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use errors::CoreError;
use models::{
    coin::CoinDetail,
    market::MarketOverview,
    settings::DashboardSettings,
    update::ChannelEvent,
    view::{NetworkFilter, PageMarker, SortField, TabFilter, ViewPage, ViewState},
};
use providers::traits::{AssetSource, PushChannel};
use services::{
    detail_service::DetailService,
    registry_service::{CoinRegistry, CoinSnapshot},
    subscription_service::SubscriptionManager,
    view_service::ViewPipeline,
};

/// User-driven changes to the dashboard, delivered to [`Dashboard::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    SelectNetwork(NetworkFilter),
    SelectTab(TabFilter),
    /// Column header click.
    SortBy(SortField),
    ClearSort,
    GoToPage(usize),
    NextPage,
    PreviousPage,
    /// Fetch a fresh snapshot and replace the registry.
    Reload,
    Stop,
}

/// Main entry point for the coin dashboard core.
///
/// Owns the coin registry, the current view state, and the subscription
/// manager, and wires them to an [`AssetSource`] and a [`PushChannel`].
/// All mutation goes through `&mut self`, so one owner drives everything
/// from a single task. Consumers read through watch receivers.
#[must_use]
pub struct Dashboard {
    settings: DashboardSettings,
    source: Arc<dyn AssetSource>,
    channel: Arc<dyn PushChannel>,
    registry: CoinRegistry,
    subscriptions: SubscriptionManager,
    pipeline: ViewPipeline,
    detail_service: DetailService,
    view_state: ViewState,
    page: ViewPage,
    page_tx: watch::Sender<ViewPage>,
    overview_tx: watch::Sender<Option<MarketOverview>>,
    stopped: bool,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("source", &self.source.name())
            .field("channel", &self.channel.name())
            .field("coins", &self.registry.len())
            .field("view_state", &self.view_state)
            .field("visible", &self.page.records.len())
            .field("joined", &self.subscriptions.joined().len())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl Dashboard {
    pub fn new(
        settings: DashboardSettings,
        source: Arc<dyn AssetSource>,
        channel: Arc<dyn PushChannel>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let (page_tx, _) = watch::channel(ViewPage::default());
        let (overview_tx, _) = watch::channel(None);

        Ok(Self {
            registry: CoinRegistry::new(settings.highlight_window()),
            subscriptions: SubscriptionManager::new(Arc::clone(&channel)),
            pipeline: ViewPipeline::new(),
            detail_service: DetailService::new(),
            view_state: ViewState::new(settings.items_per_page),
            page: ViewPage::default(),
            page_tx,
            overview_tx,
            stopped: false,
            settings,
            source,
            channel,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load the first snapshot and compute the first page.
    ///
    /// This does not connect the push channel. [`PushChannel`] has no connect
    /// operation: whoever builds the channel starts it (for SignalR,
    /// [`SignalRChannel::connect`](providers::signalr::SignalRChannel::connect))
    /// and feeds its events to [`run`](Self::run). If the channel is already
    /// up, the visible symbols are joined here; otherwise they are joined on
    /// its `Connected` event.
    pub async fn start(&mut self) -> Result<(), CoreError> {
        info!(
            component = "dashboard",
            event = "start",
            source = self.source.name(),
            channel = self.channel.name()
        );
        self.stopped = false;
        self.load_snapshot().await
    }

    /// Disconnect the channel and drop pending highlight timers.
    /// The registry stays readable.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        info!(component = "dashboard", event = "stop");
        self.stopped = true;
        self.channel.disconnect().await;
        self.subscriptions.on_disconnected();
        self.registry.clear_highlights();
        self.refresh().await;
    }

    /// Single event loop: channel events, user commands, and highlight expiry.
    ///
    /// Returns after `DashboardCommand::Stop` or once both inputs are closed;
    /// either way [`stop`](Self::stop) has run.
    pub async fn run(
        &mut self,
        mut events: mpsc::Receiver<ChannelEvent>,
        mut commands: mpsc::Receiver<DashboardCommand>,
    ) {
        let mut events_open = true;
        let mut commands_open = true;

        while events_open || commands_open {
            let deadline = self.registry.next_highlight_deadline();

            tokio::select! {
                event = events.recv(), if events_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        debug!(component = "dashboard", event = "events.closed");
                        events_open = false;
                    }
                },
                command = commands.recv(), if commands_open => match command {
                    Some(DashboardCommand::Stop) => break,
                    Some(command) => {
                        if let Err(e) = self.apply(command).await {
                            error!(component = "dashboard", event = "command.failed", error = %e);
                        }
                    }
                    None => {
                        debug!(component = "dashboard", event = "commands.closed");
                        commands_open = false;
                    }
                },
                () = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)),
                    if deadline.is_some() => {
                    self.expire_highlights().await;
                }
            }
        }

        self.stop().await;
    }

    // ── Inputs ──────────────────────────────────────────────────────

    /// Fetch the asset list and replace the registry with it.
    ///
    /// On failure the registry keeps its previous content and the error is
    /// returned as `CoreError::SnapshotLoad`.
    pub async fn load_snapshot(&mut self) -> Result<(), CoreError> {
        match self.source.fetch_assets().await {
            Ok(listings) => {
                self.registry.load_snapshot(listings);
                self.refresh().await;
                Ok(())
            }
            Err(e) => {
                error!(
                    component = "dashboard",
                    event = "snapshot.failed",
                    source = self.source.name(),
                    error = %e
                );
                Err(CoreError::SnapshotLoad(e.to_string()))
            }
        }
    }

    /// React to one event from the push channel.
    pub async fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected | ChannelEvent::Reconnected => {
                info!(component = "dashboard", event = "channel.up", channel = self.channel.name());
                self.subscriptions.on_connected().await;
            }
            ChannelEvent::Disconnected { reason } => {
                info!(component = "dashboard", event = "channel.down", reason = %reason);
                self.subscriptions.on_disconnected();
            }
            ChannelEvent::Closed => {
                warn!(component = "dashboard", event = "channel.closed", channel = self.channel.name());
                self.subscriptions.on_disconnected();
            }
            ChannelEvent::Price(update) => {
                if self.registry.apply_update(&update) {
                    self.refresh().await;
                }
            }
            ChannelEvent::GlobalMetric(metric) => {
                self.overview_tx
                    .send_replace(Some(MarketOverview::from(&metric)));
            }
        }
    }

    /// Apply one user command and recompute the page if anything changed.
    pub async fn apply(&mut self, command: DashboardCommand) -> Result<(), CoreError> {
        let total_pages = self.page.total_pages;
        let changed = match command {
            DashboardCommand::SelectNetwork(network) => {
                self.view_state.select_network(network);
                true
            }
            DashboardCommand::SelectTab(tab) => {
                self.view_state.select_tab(tab);
                true
            }
            DashboardCommand::SortBy(field) => {
                self.view_state.sort_by(field);
                true
            }
            DashboardCommand::ClearSort => {
                self.view_state.clear_sort();
                true
            }
            DashboardCommand::GoToPage(page) => self.view_state.go_to_page(page, total_pages),
            DashboardCommand::NextPage => self.view_state.next_page(total_pages),
            DashboardCommand::PreviousPage => self.view_state.previous_page(),
            DashboardCommand::Reload => return self.load_snapshot().await,
            DashboardCommand::Stop => {
                self.stop().await;
                return Ok(());
            }
        };

        if changed {
            self.refresh().await;
        }
        Ok(())
    }

    /// Clear elapsed highlights; recompute the page if any were cleared.
    pub async fn expire_highlights(&mut self) {
        if self.registry.expire_highlights() > 0 {
            self.refresh().await;
        }
    }

    /// Recompute the visible page from the registry, publish it, then bring
    /// the channel subscriptions in line with exactly those symbols.
    pub async fn refresh(&mut self) {
        let snapshot = self.registry.snapshot();
        let page = self.pipeline.compute(&snapshot, &self.view_state);
        self.view_state.current_page = page.current_page;
        let symbols = page.symbols();

        self.page = page;
        self.page_tx.send_replace(self.page.clone());

        self.subscriptions.set_visible(&symbols).await;
    }

    // ── Detail ──────────────────────────────────────────────────────

    /// One-off detail view for `symbol`, outside the live loop.
    pub async fn fetch_detail(&self, symbol: &str) -> Result<CoinDetail, CoreError> {
        self.detail_service.fetch(self.source.as_ref(), symbol).await
    }

    // ── Read side ───────────────────────────────────────────────────

    #[must_use]
    pub fn visible_page(&self) -> &ViewPage {
        &self.page
    }

    #[must_use]
    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    /// Pagination strip for the current page.
    #[must_use]
    pub fn page_numbers(&self) -> Vec<PageMarker> {
        self.pipeline
            .page_numbers(self.page.current_page, self.page.total_pages)
    }

    #[must_use]
    pub fn registry(&self) -> &CoinRegistry {
        &self.registry
    }

    #[must_use]
    pub fn joined_symbols(&self) -> &BTreeSet<String> {
        self.subscriptions.joined()
    }

    #[must_use]
    pub fn settings(&self) -> &DashboardSettings {
        &self.settings
    }

    pub fn subscribe_coins(&self) -> watch::Receiver<CoinSnapshot> {
        self.registry.subscribe()
    }

    pub fn subscribe_page(&self) -> watch::Receiver<ViewPage> {
        self.page_tx.subscribe()
    }

    pub fn subscribe_overview(&self) -> watch::Receiver<Option<MarketOverview>> {
        self.overview_tx.subscribe()
    }
}
