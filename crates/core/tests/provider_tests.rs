// ═══════════════════════════════════════════════════════════════════
// Provider Tests — SignalR hub protocol, live hub connection against a
// local server, REST source construction, coin detail from an AssetSource
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use coin_dashboard_core::errors::CoreError;
use coin_dashboard_core::models::coin::{AssetListing, PriceHistoryPoint};
use coin_dashboard_core::models::settings::DashboardSettings;
use coin_dashboard_core::models::update::ChannelEvent;
use coin_dashboard_core::providers::rest_api::RestAssetSource;
use coin_dashboard_core::providers::signalr::{
    decode_invocation, encode_record, parse_handshake_response, parse_hub_message,
    split_records, websocket_url, HubMessage, SignalRChannel, RECORD_SEPARATOR,
};
use coin_dashboard_core::providers::traits::{AssetSource, PushChannel};
use coin_dashboard_core::services::detail_service::DetailService;

// ═══════════════════════════════════════════════════════════════════
// Mock Source
// ═══════════════════════════════════════════════════════════════════

struct MockSource {
    assets: Vec<AssetListing>,
    history: Vec<PriceHistoryPoint>,
    history_since: Mutex<Option<DateTime<Utc>>>,
}

impl MockSource {
    fn new(assets: Vec<AssetListing>, history: Vec<PriceHistoryPoint>) -> Self {
        Self {
            assets,
            history,
            history_since: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AssetSource for MockSource {
    fn name(&self) -> &str {
        "MockSource"
    }

    async fn fetch_assets(&self) -> Result<Vec<AssetListing>, CoreError> {
        Ok(self.assets.clone())
    }

    async fn fetch_asset(&self, symbol: &str) -> Result<AssetListing, CoreError> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
            .cloned()
            .ok_or_else(|| CoreError::AssetNotFound(symbol.to_string()))
    }

    async fn fetch_price_history(
        &self,
        _symbol: &str,
        from: DateTime<Utc>,
    ) -> Result<Vec<PriceHistoryPoint>, CoreError> {
        *self.history_since.lock().unwrap() = Some(from);
        Ok(self.history.clone())
    }
}

fn point(hour: u32, price: f64, market_cap: f64, volume: f64) -> PriceHistoryPoint {
    PriceHistoryPoint {
        timestamp_utc: Some(Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()),
        price: Some(price),
        market_cap: Some(market_cap),
        volume: Some(volume),
        percent_change_1h: Some(0.25),
        percent_change_24h: Some(-1.5),
        percent_change_7d: Some(3.0),
        supply: Some(120_000_000.0),
    }
}

// ── Hub protocol ────────────────────────────────────────────────────

mod hub_protocol {
    use super::*;

    #[test]
    fn parses_invocation() {
        let msg = parse_hub_message(
            r#"{"type":1,"target":"ReceiveMessage","arguments":[{"data":{"asset":"BTC"}}]}"#,
        )
        .unwrap();
        match msg {
            HubMessage::Invocation { target, arguments } => {
                assert_eq!(target, "ReceiveMessage");
                assert_eq!(arguments.len(), 1);
            }
            other => panic!("expected invocation, got {other:?}"),
        }
    }

    #[test]
    fn parses_completion_with_and_without_error() {
        assert_eq!(
            parse_hub_message(r#"{"type":3,"invocationId":"7"}"#).unwrap(),
            HubMessage::Completion { invocation_id: "7".into(), error: None }
        );
        assert_eq!(
            parse_hub_message(r#"{"type":3,"invocationId":"8","error":"no such group"}"#).unwrap(),
            HubMessage::Completion {
                invocation_id: "8".into(),
                error: Some("no such group".into())
            }
        );
    }

    #[test]
    fn parses_ping_close_and_other() {
        assert_eq!(parse_hub_message(r#"{"type":6}"#).unwrap(), HubMessage::Ping);
        assert_eq!(
            parse_hub_message(r#"{"type":7,"error":"bye","allowReconnect":true}"#).unwrap(),
            HubMessage::Close { error: Some("bye".into()), allow_reconnect: true }
        );
        assert_eq!(
            parse_hub_message(r#"{"type":7}"#).unwrap(),
            HubMessage::Close { error: None, allow_reconnect: false }
        );
        assert_eq!(parse_hub_message(r#"{"type":2}"#).unwrap(), HubMessage::Other(2));
    }

    #[test]
    fn rejects_malformed_records() {
        assert!(matches!(parse_hub_message("{}"), Err(CoreError::Protocol(_))));
        assert!(matches!(parse_hub_message(r#"{"type":1}"#), Err(CoreError::Protocol(_))));
        assert!(matches!(parse_hub_message(r#"{"type":3}"#), Err(CoreError::Protocol(_))));
        assert!(matches!(parse_hub_message("not json"), Err(CoreError::Deserialization(_))));
    }

    #[test]
    fn handshake_response() {
        assert!(parse_handshake_response("{}").is_ok());
        assert!(matches!(
            parse_handshake_response(r#"{"error":"unsupported protocol"}"#),
            Err(CoreError::Protocol(msg)) if msg.contains("unsupported protocol")
        ));
    }

    #[test]
    fn records_survive_frame_boundaries() {
        let first = encode_record(&json!({ "type": 6 }));
        let second = encode_record(&json!({ "type": 3, "invocationId": "1" }));
        let joined = format!("{first}{second}");
        let (head, tail) = joined.split_at(first.len() + 5);

        let mut buffer = head.to_string();
        let records = split_records(&mut buffer);
        assert_eq!(records.len(), 1);
        assert_eq!(parse_hub_message(&records[0]).unwrap(), HubMessage::Ping);

        buffer.push_str(tail);
        let records = split_records(&mut buffer);
        assert_eq!(records.len(), 1);
        assert!(buffer.is_empty());
        assert!(!records[0].contains(RECORD_SEPARATOR));
    }
}

// ── Invocation decoding ─────────────────────────────────────────────

mod invocations {
    use super::*;

    #[test]
    fn price_push_becomes_price_event() {
        let event = decode_invocation(
            "receivemessage",
            &[json!({ "data": { "asset": "ETH", "price": 3100.5 } })],
        );
        match event {
            Some(ChannelEvent::Price(update)) => {
                assert_eq!(update.asset, "ETH");
                assert_eq!(update.price, Some(3100.5));
            }
            other => panic!("expected price event, got {other:?}"),
        }
    }

    #[test]
    fn global_metric_push_becomes_metric_event() {
        let event = decode_invocation(
            "ReceiveGlobalMetric",
            &[json!({ "data": { "fear_and_greed_index": 40 } })],
        );
        assert!(matches!(event, Some(ChannelEvent::GlobalMetric(m)) if m.fear_and_greed_index == Some(40.0)));
    }

    #[test]
    fn unknown_target_or_bad_payload_is_dropped() {
        assert!(decode_invocation("SomethingElse", &[json!({ "data": {} })]).is_none());
        assert!(decode_invocation("ReceiveMessage", &[]).is_none());
        assert!(decode_invocation("ReceiveMessage", &[json!({ "data": { "price": 1 } })]).is_none());
    }
}

// ── WebSocket URL ───────────────────────────────────────────────────

mod urls {
    use super::*;

    #[test]
    fn maps_http_schemes() {
        assert_eq!(
            websocket_url("https://api.example.com/pricehub", None).unwrap(),
            "wss://api.example.com/pricehub"
        );
        assert_eq!(
            websocket_url("http://localhost:5000/pricehub", None).unwrap(),
            "ws://localhost:5000/pricehub"
        );
        assert_eq!(
            websocket_url("wss://already/hub", None).unwrap(),
            "wss://already/hub"
        );
    }

    #[test]
    fn appends_encoded_token() {
        assert_eq!(
            websocket_url("https://h/pricehub", Some("a+b/c=")).unwrap(),
            "wss://h/pricehub?id=a%2Bb%2Fc%3D"
        );
        assert_eq!(
            websocket_url("https://h/pricehub?v=1", Some("tok")).unwrap(),
            "wss://h/pricehub?v=1&id=tok"
        );
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            websocket_url("ftp://h/hub", None),
            Err(CoreError::InvalidConfig(_))
        ));
    }
}

// ── Hub connection ──────────────────────────────────────────────────

mod connection {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    type ServerSocket = WebSocketStream<TcpStream>;

    /// Local stand-in for the backend hub: answers `POST .../negotiate` over
    /// plain HTTP and upgrades every other connection to a WebSocket. After
    /// `max_sessions` hub sessions it stops listening, so later reconnects
    /// are refused.
    struct TestHub {
        url: String,
        sessions: mpsc::UnboundedReceiver<ServerSocket>,
    }

    impl TestHub {
        async fn start(max_sessions: usize) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, sessions) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                let mut served = 0;
                while served < max_sessions {
                    let Ok((mut stream, _)) = listener.accept().await else {
                        return;
                    };
                    if is_negotiate(&stream).await {
                        answer_negotiate(&mut stream).await;
                        continue;
                    }
                    let Ok(mut socket) = accept_async(stream).await else {
                        continue;
                    };
                    // Handshake request, then the empty `{}` acceptance.
                    let Some(Ok(Message::Text(_))) = socket.next().await else {
                        continue;
                    };
                    let accepted = format!("{{}}{RECORD_SEPARATOR}");
                    if socket.send(Message::Text(accepted.into())).await.is_err() {
                        continue;
                    }
                    served += 1;
                    let _ = tx.send(socket);
                }
            });

            Self {
                url: format!("http://{addr}/pricehub"),
                sessions,
            }
        }

        async fn next_session(&mut self) -> ServerSocket {
            tokio::time::timeout(WAIT, self.sessions.recv())
                .await
                .expect("hub session in time")
                .expect("hub still listening")
        }
    }

    async fn is_negotiate(stream: &TcpStream) -> bool {
        let mut head = [0u8; 4];
        loop {
            match stream.peek(&mut head).await {
                Ok(n) if n >= head.len() => return &head == b"POST",
                Ok(0) | Err(_) => return false,
                Ok(_) => tokio::task::yield_now().await,
            }
        }
    }

    async fn answer_negotiate(stream: &mut TcpStream) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&chunk[..n]),
            }
        }
        let body = r#"{"negotiateVersion":1,"connectionToken":"tok-1","availableTransports":[]}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn hub_settings(invoke_timeout_secs: u64, reconnect_delays_ms: Vec<u64>) -> DashboardSettings {
        DashboardSettings {
            api_url: "http://127.0.0.1".into(),
            reconnect_delays_ms,
            request_timeout_secs: 5,
            invoke_timeout_secs,
            ..DashboardSettings::default()
        }
    }

    async fn send_records(socket: &mut ServerSocket, records: &[Value]) {
        let frame: String = records.iter().map(encode_record).collect();
        socket.send(Message::Text(frame.into())).await.unwrap();
    }

    /// The next invocation the client sent, skipping keep-alive pings.
    async fn next_invocation(socket: &mut ServerSocket) -> Value {
        loop {
            let msg = tokio::time::timeout(WAIT, socket.next())
                .await
                .expect("invocation in time")
                .expect("client still connected")
                .unwrap();
            if let Message::Text(text) = msg {
                let mut buffer = text.as_str().to_string();
                for record in split_records(&mut buffer) {
                    let value: Value = serde_json::from_str(&record).unwrap();
                    if value["type"] == 1 {
                        return value;
                    }
                }
            }
        }
    }

    fn completion(call: &Value, error: Option<&str>) -> Value {
        match error {
            Some(error) => json!({ "type": 3, "invocationId": call["invocationId"], "error": error }),
            None => json!({ "type": 3, "invocationId": call["invocationId"] }),
        }
    }

    fn price_push(asset: &str, price: f64) -> Value {
        json!({
            "type": 1,
            "target": "ReceiveMessage",
            "arguments": [{ "data": { "asset": asset, "price": price } }]
        })
    }

    async fn next_event(events: &mut mpsc::Receiver<ChannelEvent>) -> ChannelEvent {
        tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("event in time")
            .expect("event stream open")
    }

    async fn connected(
        hub: &mut TestHub,
        settings: &DashboardSettings,
    ) -> (SignalRChannel, mpsc::Receiver<ChannelEvent>, ServerSocket) {
        let (channel, mut events) = SignalRChannel::connect(hub.url.clone(), settings);
        let server = hub.next_session().await;
        assert_eq!(next_event(&mut events).await, ChannelEvent::Connected);
        assert!(channel.is_connected());
        (channel, events, server)
    }

    #[tokio::test]
    async fn join_round_trip() {
        let mut hub = TestHub::start(1).await;
        let (channel, _events, mut server) = connected(&mut hub, &hub_settings(5, vec![])).await;

        let (result, ()) = tokio::join!(channel.join("BTC"), async {
            let call = next_invocation(&mut server).await;
            assert_eq!(call["target"], "JoinAssetGroup");
            assert_eq!(call["arguments"], json!(["BTC"]));
            send_records(&mut server, &[completion(&call, None)]).await;
        });
        result.unwrap();
    }

    #[tokio::test]
    async fn completion_error_fails_the_call() {
        let mut hub = TestHub::start(1).await;
        let (channel, _events, mut server) = connected(&mut hub, &hub_settings(5, vec![])).await;

        let (result, ()) = tokio::join!(channel.leave("ETH"), async {
            let call = next_invocation(&mut server).await;
            assert_eq!(call["target"], "LeaveAssetGroup");
            send_records(&mut server, &[completion(&call, Some("no such group"))]).await;
        });
        assert!(matches!(
            result,
            Err(CoreError::Subscription { symbol, message })
                if symbol == "ETH" && message == "LeaveAssetGroup: no such group"
        ));
    }

    #[tokio::test]
    async fn unanswered_call_times_out() {
        let mut hub = TestHub::start(1).await;
        let (channel, _events, mut server) = connected(&mut hub, &hub_settings(1, vec![])).await;

        let (result, _call) = tokio::join!(channel.join("SOL"), next_invocation(&mut server));
        assert!(matches!(
            result,
            Err(CoreError::Subscription { message, .. }) if message.ends_with("timed out")
        ));
    }

    #[tokio::test]
    async fn pushes_become_price_events() {
        let mut hub = TestHub::start(1).await;
        let (_channel, mut events, mut server) =
            connected(&mut hub, &hub_settings(5, vec![])).await;

        send_records(&mut server, &[json!({ "type": 6 }), price_push("btc", 105.0)]).await;
        match next_event(&mut events).await {
            ChannelEvent::Price(update) => {
                assert_eq!(update.asset, "btc");
                assert_eq!(update.price, Some(105.0));
            }
            other => panic!("expected a price event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn undrained_push_burst_does_not_delay_completions() {
        let mut hub = TestHub::start(1).await;
        let (channel, mut events, mut server) =
            connected(&mut hub, &hub_settings(5, vec![])).await;

        // Nobody reads `events` until the join resolves, like a dashboard
        // awaiting its subscription pass.
        let (result, ()) = tokio::join!(channel.join("BTC"), async {
            let call = next_invocation(&mut server).await;
            for batch in 0..30u32 {
                let pushes: Vec<Value> = (1..=100u32)
                    .map(|i| price_push("BTC", f64::from(batch * 100 + i)))
                    .collect();
                send_records(&mut server, &pushes).await;
            }
            send_records(&mut server, &[completion(&call, None)]).await;
        });
        result.unwrap();

        let mut delivered = 0;
        let mut latest = None;
        while latest != Some(3000.0) {
            match next_event(&mut events).await {
                ChannelEvent::Price(update) => {
                    delivered += 1;
                    latest = update.price;
                }
                other => panic!("expected a price event, got {other:?}"),
            }
        }
        assert!(delivered < 3000, "backlogged pushes were not merged");
    }

    #[tokio::test]
    async fn server_close_without_reconnect_ends_the_channel() {
        let mut hub = TestHub::start(2).await;
        let (channel, mut events, mut server) =
            connected(&mut hub, &hub_settings(5, vec![0, 0])).await;

        send_records(
            &mut server,
            &[json!({ "type": 7, "error": "shutting down", "allowReconnect": false })],
        )
        .await;

        assert_eq!(
            next_event(&mut events).await,
            ChannelEvent::Disconnected {
                reason: "shutting down".into()
            }
        );
        assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
        assert!(!channel.is_connected());
        assert!(matches!(
            channel.join("BTC").await,
            Err(CoreError::ChannelNotConnected)
        ));
    }

    #[tokio::test]
    async fn reconnects_then_closes_once_delays_run_out() {
        let mut hub = TestHub::start(2).await;
        let (channel, mut events, server) =
            connected(&mut hub, &hub_settings(5, vec![0, 50])).await;

        drop(server);
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::Disconnected { .. }
        ));
        let server = hub.next_session().await;
        assert_eq!(next_event(&mut events).await, ChannelEvent::Reconnected);
        assert!(channel.is_connected());

        // The hub stopped listening after its second session.
        drop(server);
        assert!(matches!(
            next_event(&mut events).await,
            ChannelEvent::Disconnected { .. }
        ));
        assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
        assert!(!channel.is_connected());
    }

    #[tokio::test]
    async fn first_connect_failure_closes_without_retry() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (channel, mut events) = SignalRChannel::connect(
            format!("http://{addr}/pricehub"),
            &hub_settings(5, vec![0, 0, 0]),
        );
        assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
        assert!(!channel.is_connected());
        assert!(tokio::time::timeout(WAIT, events.recv()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn disconnect_fails_pending_calls() {
        let mut hub = TestHub::start(1).await;
        let (channel, mut events, mut server) =
            connected(&mut hub, &hub_settings(5, vec![0])).await;

        let (result, ()) = tokio::join!(channel.join("ADA"), async {
            next_invocation(&mut server).await;
            channel.disconnect().await;
        });
        assert!(matches!(
            result,
            Err(CoreError::Subscription { message, .. }) if message.ends_with("channel disconnected")
        ));
        assert!(!channel.is_connected());
        assert!(matches!(
            channel.join("ADA").await,
            Err(CoreError::ChannelNotConnected)
        ));
        assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
    }
}

// ── REST source ─────────────────────────────────────────────────────

mod rest_source {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let settings = DashboardSettings {
            api_url: "https://api.example.com/".into(),
            ..DashboardSettings::default()
        };
        let source = RestAssetSource::new(&settings).unwrap();
        assert_eq!(source.base_url(), "https://api.example.com");
        assert_eq!(source.name(), "DashboardApi");
    }

    #[test]
    fn symbols_are_escaped_as_one_path_segment() {
        let source = RestAssetSource::new(&DashboardSettings {
            api_url: "https://api.example.com/backend/".into(),
            ..DashboardSettings::default()
        })
        .unwrap();

        assert_eq!(
            source.endpoint(&["api", "Asset", "BTC"]).as_str(),
            "https://api.example.com/backend/api/Asset/BTC"
        );
        assert_eq!(
            source.endpoint(&["api", "Prices", "../Asset?x#y"]).as_str(),
            "https://api.example.com/backend/api/Prices/..%2FAsset%3Fx%23y"
        );
    }

    #[test]
    fn rejects_invalid_settings() {
        let settings = DashboardSettings {
            api_url: "api.example.com".into(),
            ..DashboardSettings::default()
        };
        assert!(matches!(
            RestAssetSource::new(&settings),
            Err(CoreError::InvalidConfig(_))
        ));
    }
}

// ── Coin detail ─────────────────────────────────────────────────────

mod detail {
    use super::*;

    fn source() -> MockSource {
        let mut sol = AssetListing::new("SOL", "Solana");
        sol.rank = Some(5);
        sol.network = Some("Solana".into());
        MockSource::new(
            vec![sol],
            vec![
                point(10, 140.0, 60_000_000.0, 3_000_000.0),
                point(12, 150.0, 64_000_000.0, 1_600_000.0),
                point(11, 145.0, 62_000_000.0, 2_000_000.0),
            ],
        )
    }

    #[tokio::test]
    async fn uses_latest_point_by_timestamp() {
        let detail = DetailService::new().fetch(&source(), "sol").await.unwrap();

        assert_eq!(detail.coin.symbol, "SOL");
        assert_eq!(detail.coin.price, "$150.00");
        assert_eq!(detail.coin.market_cap, "$64,000,000");
        assert_eq!(detail.coin.volume, "$1,600,000");
        assert_eq!(detail.coin.change_1h, "+0.25%");
        assert_eq!(detail.coin.change_24h, "-1.50%");
        assert!(!detail.coin.is_positive_24h);
        assert_eq!(detail.coin.supply, "120,000,000 SOL");
        assert_eq!(detail.stats.volume_market_cap_ratio, "2.50%");
        assert_eq!(detail.stats.market_cap.value, "$64,000,000");
        assert_eq!(detail.stats.market_cap.change, "-1.50%");
        assert_eq!(detail.stats.circulating_supply, "120,000,000 SOL");
    }

    #[tokio::test]
    async fn history_window_is_last_24h() {
        let source = source();
        let before = Utc::now();
        DetailService::new().fetch(&source, "SOL").await.unwrap();
        let since = source.history_since.lock().unwrap().unwrap();
        let age = before - since;
        assert!(age >= chrono::Duration::hours(24) - chrono::Duration::seconds(5));
        assert!(age <= chrono::Duration::hours(24) + chrono::Duration::seconds(5));
    }

    /// Each request waits until the other one has started.
    struct RendezvousSource {
        both_started: tokio::sync::Barrier,
    }

    #[async_trait]
    impl AssetSource for RendezvousSource {
        fn name(&self) -> &str {
            "RendezvousSource"
        }

        async fn fetch_assets(&self) -> Result<Vec<AssetListing>, CoreError> {
            Ok(Vec::new())
        }

        async fn fetch_asset(&self, symbol: &str) -> Result<AssetListing, CoreError> {
            self.both_started.wait().await;
            Ok(AssetListing::new(symbol, "Cardano"))
        }

        async fn fetch_price_history(
            &self,
            _symbol: &str,
            _from: DateTime<Utc>,
        ) -> Result<Vec<PriceHistoryPoint>, CoreError> {
            self.both_started.wait().await;
            Ok(vec![point(9, 0.5, 18_000_000.0, 900_000.0)])
        }
    }

    #[tokio::test]
    async fn asset_and_history_are_requested_together() {
        let source = RendezvousSource {
            both_started: tokio::sync::Barrier::new(2),
        };
        let detail = tokio::time::timeout(
            Duration::from_secs(5),
            DetailService::new().fetch(&source, "ADA"),
        )
        .await
        .expect("requests ran one after the other")
        .unwrap();
        assert_eq!(detail.coin.price, "$0.50");
    }

    #[tokio::test]
    async fn unknown_symbol() {
        let err = DetailService::new().fetch(&source(), "DOGE").await.unwrap_err();
        assert!(matches!(err, CoreError::AssetNotFound(s) if s == "DOGE"));
    }

    #[tokio::test]
    async fn empty_symbol_is_rejected() {
        let err = DetailService::new().fetch(&source(), "  ").await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));
    }

    #[test]
    fn no_history_means_zeroes() {
        let detail = DetailService::new().build(AssetListing::new("ADA", "Cardano"), &[]);
        assert_eq!(detail.coin.price, "$0.00");
        assert_eq!(detail.stats.volume_market_cap_ratio, "0.00%");
        assert_eq!(detail.stats.total_supply, "0 ADA");
    }
}
