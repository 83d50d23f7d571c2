use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use common::{Account, Candle, Error, EventKind, KlineTick, MarketData, Result, TickStream};
use engine::{ConnectorSettings, EventHub, MarketDataConnector, Ports, StrategyRuntime};
use store::MemoryStore;
use strategy::BotConfig;

const HISTORY: i64 = 30;

/// Scripted exchange: the first session delivers one closed candle and then
/// the server hangs up, the second fails to connect, later ones stay open.
struct Scripted {
    backfills: AtomicUsize,
    subscribes: AtomicUsize,
    rotate_only: bool,
}

impl Scripted {
    fn new(rotate_only: bool) -> Self {
        Self { backfills: AtomicUsize::new(0), subscribes: AtomicUsize::new(0), rotate_only }
    }
}

fn history() -> Vec<Candle> {
    (1..=HISTORY)
        .map(|m| {
            let p = 100.0 + m as f64;
            Candle { open: p, high: p + 0.5, low: p - 0.5, close: p, volume: 1.0, time: m * 60 }
        })
        .collect()
}

fn tick(close: f64, is_final: bool) -> Result<KlineTick> {
    Ok(KlineTick {
        open: 130.0,
        high: close.max(130.0),
        low: close.min(130.0),
        close,
        volume: 2.0,
        is_final,
        close_time_ms: (HISTORY + 1) * 60_000,
    })
}

#[async_trait]
impl MarketData for Scripted {
    async fn current_price(&self, _: &str) -> Result<f64> {
        Ok(131.0)
    }

    async fn historical_candles(&self, _: &str, _: &str, limit: usize) -> Result<Vec<Candle>> {
        self.backfills.fetch_add(1, Ordering::SeqCst);
        let all = history();
        let skip = all.len().saturating_sub(limit);
        Ok(all[skip..].to_vec())
    }

    async fn subscribe(&self, _: &str, _: &str) -> Result<TickStream> {
        let n = self.subscribes.fetch_add(1, Ordering::SeqCst);
        if self.rotate_only {
            return Ok(stream::pending().boxed());
        }
        match n {
            0 => Ok(stream::iter(vec![tick(130.5, false), tick(131.0, true)]).boxed()),
            1 => Err(Error::WebSocket("connection refused".into())),
            _ => Ok(stream::pending().boxed()),
        }
    }
}

fn runtime() -> StrategyRuntime {
    let ports = Ports::shared(Arc::new(MemoryStore::new()));
    let bot = BotConfig {
        id: Uuid::new_v4(),
        symbol: "BTCUSDT".into(),
        interval: "1m".into(),
        strategy: "RSI2".into(),
        active: true,
        window_size: 240,
        indicators: Default::default(),
    };
    let account = Account { id: Uuid::nil(), name: "reconnect".into() };
    StrategyRuntime::new(account, bot, ports, EventHub::new()).unwrap()
}

async fn wait_for(counter: &AtomicUsize, at_least: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < at_least {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("connector did not reconnect in time");
}

#[tokio::test]
async fn resumes_after_stream_termination_without_duplicates() {
    let market = Arc::new(Scripted::new(false));
    let rt = runtime();
    let state = rt.state_receiver();
    let stop = CancellationToken::new();
    let settings = ConnectorSettings {
        reconnect_delay: Duration::from_millis(10),
        heartbeat_interval: Duration::from_secs(1),
        max_session: Duration::from_secs(60),
    };
    let task = tokio::spawn(MarketDataConnector::new(rt, market.clone(), settings, stop.clone()).unwrap().run());

    wait_for(&market.subscribes, 3).await;
    assert!(market.backfills.load(Ordering::SeqCst) >= 3);

    {
        let s = state.borrow();
        assert_eq!(s.total_candles, HISTORY as u64 + 1);
        assert_eq!(s.window.last().map(|c| c.time), Some((HISTORY + 1) * 60));
    }

    stop.cancel();
    stop.cancel();
    let rt = task.await.unwrap();
    let last = rt.window().last().copied().unwrap();
    assert_eq!(last.open, 130.0);
    assert_eq!(last.close, 131.0);
    assert_eq!(rt.window().total_candles(), HISTORY as u64 + 1);
}

#[tokio::test]
async fn rotates_session_without_backoff() {
    let market = Arc::new(Scripted::new(true));
    let stop = CancellationToken::new();
    let settings = ConnectorSettings {
        reconnect_delay: Duration::from_secs(3600),
        heartbeat_interval: Duration::from_millis(5),
        max_session: Duration::from_millis(20),
    };
    let task = tokio::spawn(MarketDataConnector::new(runtime(), market.clone(), settings, stop.clone()).unwrap().run());

    wait_for(&market.subscribes, 3).await;

    stop.cancel();
    let rt = task.await.unwrap();
    // every rotation re-backfills but nothing is duplicated
    assert_eq!(rt.window().total_candles(), HISTORY as u64);
}

#[tokio::test]
async fn stop_interrupts_backoff() {
    let market = Arc::new(Scripted::new(false));
    let stop = CancellationToken::new();
    let settings = ConnectorSettings {
        reconnect_delay: Duration::from_secs(3600),
        ..ConnectorSettings::default()
    };
    let task = tokio::spawn(MarketDataConnector::new(runtime(), market.clone(), settings, stop.clone()).unwrap().run());

    // first session ends, connector is now sleeping for an hour
    wait_for(&market.subscribes, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.cancel();

    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("connector ignored stop during backoff")
        .unwrap();
    assert_eq!(market.subscribes.load(Ordering::SeqCst), 1);
}

/// Rising history, then one live kline that closes the next candle.
struct RisingThenLive {
    subscribes: AtomicUsize,
}

const LIVE_CLOSE_MS: i64 = 26 * 60_000 + 59_999;

#[async_trait]
impl MarketData for RisingThenLive {
    async fn current_price(&self, _: &str) -> Result<f64> {
        Ok(125.0)
    }

    async fn historical_candles(&self, _: &str, _: &str, _: usize) -> Result<Vec<Candle>> {
        Ok((1..=25)
            .map(|m| {
                let p = 99.0 + m as f64;
                Candle { open: p, high: p, low: p, close: p, volume: 1.0, time: m * 60 }
            })
            .collect())
    }

    async fn subscribe(&self, _: &str, _: &str) -> Result<TickStream> {
        if self.subscribes.fetch_add(1, Ordering::SeqCst) > 0 {
            return Ok(stream::pending().boxed());
        }
        let tick = |close: f64, is_final: bool| -> Result<KlineTick> {
            Ok(KlineTick {
                open: 124.5,
                high: 125.0,
                low: 124.5,
                close,
                volume: 1.0,
                is_final,
                close_time_ms: LIVE_CLOSE_MS,
            })
        };
        Ok(stream::iter(vec![tick(124.8, false), tick(125.0, true)])
            .chain(stream::pending())
            .boxed())
    }
}

#[tokio::test]
async fn closed_candle_is_published_before_its_decision() {
    let store = Arc::new(MemoryStore::new());
    let hub = EventHub::new();
    let bot = BotConfig {
        id: Uuid::new_v4(),
        symbol: "BTCUSDT".into(),
        interval: "1m".into(),
        strategy: "CROSSOVER".into(),
        active: true,
        window_size: 240,
        indicators: Default::default(),
    };
    let mut events = hub.subscribe(&bot.id.to_string());
    let account = Account { id: Uuid::nil(), name: "live".into() };
    let rt = StrategyRuntime::new(account, bot, Ports::shared(store.clone()), hub).unwrap();

    let market = Arc::new(RisingThenLive { subscribes: AtomicUsize::new(0) });
    let stop = CancellationToken::new();
    let task = tokio::spawn(
        MarketDataConnector::new(rt, market, ConnectorSettings::default(), stop.clone())
            .unwrap()
            .run(),
    );

    let first = tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
    let second = tokio::time::timeout(Duration::from_secs(5), events.recv()).await.unwrap().unwrap();
    assert_eq!(first.kind, EventKind::Candle);
    assert_eq!(first.data["close"], 125.0);
    assert_eq!(first.data["time"], LIVE_CLOSE_MS / 1000);
    assert_eq!(second.kind, EventKind::Decision);
    assert_eq!(second.data["decision"], "BUY");

    stop.cancel();
    task.await.unwrap();

    // the decision carries the kline's exact close time
    let logs = store.decisions().await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].timestamp, LIVE_CLOSE_MS);
    assert_eq!(store.positions().await[0].entry_timestamp, LIVE_CLOSE_MS);
}
