use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use coin_dashboard_core::models::settings::DashboardSettings;
use coin_dashboard_core::models::update::ChannelEvent;
use coin_dashboard_core::observability::{init_logging, log_app_start, LoggingConfig};
use coin_dashboard_core::providers::rest_api::RestAssetSource;
use coin_dashboard_core::providers::signalr::SignalRChannel;
use coin_dashboard_core::providers::traits::PushChannel;
use coin_dashboard_core::services::format_service::format_percent;
use coin_dashboard_core::{Dashboard, DashboardCommand};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let logging = LoggingConfig::from_env();
    if let Err(e) = init_logging(&logging) {
        eprintln!("failed to initialize logging: {e}");
    }

    let settings = match DashboardSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!(component = "coin_dashboard", event = "config.invalid", error = %e);
            std::process::exit(2);
        }
    };
    log_app_start(&logging, &settings);

    if let Err(e) = run(settings).await {
        error!(component = "coin_dashboard", event = "app.failed", error = %e);
        std::process::exit(1);
    }
}

async fn run(settings: DashboardSettings) -> Result<(), coin_dashboard_core::errors::CoreError> {
    let source = Arc::new(RestAssetSource::new(&settings)?);
    let (prices, price_events) = SignalRChannel::connect(settings.price_hub_url(), &settings);
    let (metrics, metric_events) = SignalRChannel::connect(settings.metrics_hub_url(), &settings);
    let prices = Arc::new(prices);
    let metrics = Arc::new(metrics);

    let events = merge_events(price_events, metric_events);
    let (commands_tx, commands_rx) = mpsc::channel(16);

    let mut dashboard = Dashboard::new(settings, source, prices)?;
    if let Err(e) = dashboard.start().await {
        // The push channel can still fill in prices; a reload may recover.
        error!(component = "coin_dashboard", event = "snapshot.unavailable", error = %e);
    }

    let mut pages = dashboard.subscribe_page();
    tokio::spawn(async move {
        while pages.changed().await.is_ok() {
            let page = pages.borrow_and_update().clone();
            info!(
                component = "coin_dashboard",
                event = "page",
                page = page.current_page,
                total_pages = page.total_pages,
                rows = page.records.len(),
                symbols = %page.symbols().join(",")
            );
        }
    });

    let mut overview = dashboard.subscribe_overview();
    tokio::spawn(async move {
        while overview.changed().await.is_ok() {
            let Some(market) = overview.borrow_and_update().clone() else {
                continue;
            };
            info!(
                component = "coin_dashboard",
                event = "market",
                total_market_cap = %market.total_market_cap,
                total_volume_24h = %market.total_volume_24h,
                btc_dominance = %format_percent(market.btc_dominance_percent * 100.0),
                fear_greed = %market.fear_greed_text
            );
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(component = "coin_dashboard", event = "signal.interrupt");
            let _ = commands_tx.send(DashboardCommand::Stop).await;
        }
    });

    dashboard.run(events, commands_rx).await;
    metrics.disconnect().await;
    info!(component = "coin_dashboard", event = "app.stop");
    Ok(())
}

/// Feed both hubs into one stream. Only the price hub's lifecycle events
/// drive subscriptions; the metrics hub contributes market overviews only.
fn merge_events(
    mut prices: mpsc::Receiver<ChannelEvent>,
    mut metrics: mpsc::Receiver<ChannelEvent>,
) -> mpsc::Receiver<ChannelEvent> {
    let (tx, rx) = mpsc::channel(256);

    let price_tx = tx.clone();
    tokio::spawn(async move {
        while let Some(event) = prices.recv().await {
            if price_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(event) = metrics.recv().await {
            if matches!(event, ChannelEvent::GlobalMetric(_)) && tx.send(event).await.is_err() {
                break;
            }
        }
    });

    rx
}
