use std::sync::Arc;

use common::{Account, Candle, Decision, EventKind, ExecutionLogStore};
use engine::{EventHub, PositionState, Ports, StrategyRuntime};
use store::MemoryStore;
use strategy::BotConfig;
use uuid::Uuid;

fn candle(close: f64, minute: i64) -> Candle {
    Candle { open: close, high: close, low: close, close, volume: 1.0, time: minute * 60 }
}

fn crossover_bot() -> BotConfig {
    BotConfig {
        id: Uuid::new_v4(),
        symbol: "BTCUSDT".into(),
        interval: "1m".into(),
        strategy: "CROSSOVER".into(),
        active: true,
        window_size: 240,
        indicators: Default::default(),
    }
}

#[tokio::test]
async fn rising_then_falling_market_trades_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let ports = Ports::shared(store.clone());
    let hub = EventHub::new();
    let bot = crossover_bot();
    let mut events = hub.subscribe(&bot.id.to_string());
    let account = Account { id: Uuid::nil(), name: "scenario".into() };
    let mut rt = StrategyRuntime::new(account, bot.clone(), ports, hub.clone()).unwrap();

    // 26 candles rising linearly 100 → 125
    let mut decisions = Vec::new();
    for (i, close) in (100..=125).enumerate() {
        let minute = i as i64 + 1;
        rt.update_candle(candle(close as f64, minute));
        decisions.push(rt.evaluate(minute * 60_000).await);
    }
    assert!(decisions[..25].iter().all(|d| *d == Decision::Hold));
    assert_eq!(decisions[25], Decision::Buy);
    assert_eq!(
        rt.position(),
        PositionState::InPosition { entry_price: 125.0, entry_timestamp: 26 * 60_000 }
    );
    assert_eq!(store.positions().await.len(), 1);

    // price collapses below MA9; MA9 needs a few candles to cross under MA26
    let mut after = Vec::new();
    for minute in 27..=30 {
        rt.update_candle(candle(80.0, minute));
        after.push(rt.evaluate(minute * 60_000).await);
    }
    assert_eq!(after, vec![Decision::Hold, Decision::Hold, Decision::Sell, Decision::Hold]);
    assert!(rt.is_flat());
    assert!(store.positions().await.is_empty());

    let executions = ExecutionLogStore::all(store.as_ref()).await.unwrap();
    assert_eq!(executions.len(), 1);
    let trade = &executions[0];
    assert_eq!(trade.profit, 80.0 - 125.0);
    assert!((trade.roi_pct + 36.0).abs() < 1e-9);
    assert_eq!(trade.duration, 180);
    assert_eq!(trade.strategy.name, "CROSSOVER");

    let logged: Vec<Decision> = store.decisions().await.iter().map(|d| d.decision).collect();
    assert_eq!(logged, vec![Decision::Buy, Decision::Sell]);

    let buy = events.recv().await.unwrap();
    assert_eq!(buy.kind, EventKind::Decision);
    assert_eq!(buy.data["decision"], "BUY");
    assert_eq!(buy.data["time"], 26 * 60);
    let sell = events.recv().await.unwrap();
    assert_eq!(sell.data["decision"], "SELL");
    assert_eq!(sell.data["price"], 80.0);
}

#[tokio::test]
async fn decision_log_carries_audit_detail() {
    let store = Arc::new(MemoryStore::new());
    let ports = Ports::shared(store.clone());
    let account = Account { id: Uuid::nil(), name: "scenario".into() };
    let mut rt = StrategyRuntime::new(account, crossover_bot(), ports, EventHub::new()).unwrap();

    for (i, close) in (100..=125).enumerate() {
        let minute = i as i64 + 1;
        rt.update_candle(candle(close as f64, minute));
        rt.evaluate(minute * 60_000).await;
    }

    let logs = store.decisions().await;
    assert_eq!(logs.len(), 1);
    let log = &logs[0];
    assert_eq!(log.decision, Decision::Buy);
    assert_eq!(log.timestamp, 26 * 60_000);
    assert_eq!(log.indicators["price"], 125.0);
    assert!(log.indicators.contains_key("sma_9"));
    assert!(log.indicators.contains_key("sma_26"));
    assert_eq!(log.strategy.version, "1.0.1");
    assert_eq!(log.strategy.parameters["slow"], 26);
    assert_eq!(log.context["candles_total"], 26);
    assert_eq!(log.context["position_quantity"], 1);
}
