use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// One closed OHLCV bar. `time` is the bar's close time in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub time: i64,
}

/// Partial or final kline update from the exchange stream.
/// Only ticks where `is_final == true` close a candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KlineTick {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Cumulative base-asset volume of the kline so far.
    pub volume: f64,
    pub is_final: bool,
    /// Kline close time in epoch milliseconds.
    pub close_time_ms: i64,
}

/// Outcome of one strategy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Buy => write!(f, "BUY"),
            Decision::Sell => write!(f, "SELL"),
            Decision::Hold => write!(f, "HOLD"),
        }
    }
}

/// The account a bot trades for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
}

/// Durable record of a bot being in position. Exists iff the bot holds one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub bot_id: Uuid,
    pub entry_price: f64,
    /// Entry time in epoch milliseconds.
    pub entry_timestamp: i64,
}

/// Strategy identity stamped on every audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Append-only audit record of a BUY or SELL decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionLog {
    pub bot_id: Uuid,
    pub symbol: String,
    pub interval: String,
    /// Decision time in epoch milliseconds.
    pub timestamp: i64,
    pub decision: Decision,
    pub indicators: BTreeMap<String, f64>,
    pub strategy: StrategyInfo,
    pub context: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePoint {
    pub price: f64,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

/// Append-only record of one closed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub bot_id: Uuid,
    pub symbol: String,
    pub interval: String,
    pub entry: TradePoint,
    pub exit: TradePoint,
    /// Holding time in seconds.
    pub duration: i64,
    pub profit: f64,
    pub roi_pct: f64,
    pub strategy: StrategyInfo,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLog {
    /// Close a trade: profit, ROI and duration are derived from the two points.
    pub fn close(
        bot_id: Uuid,
        symbol: impl Into<String>,
        interval: impl Into<String>,
        entry: TradePoint,
        exit: TradePoint,
        strategy: StrategyInfo,
    ) -> Self {
        let profit = exit.price - entry.price;
        let roi_pct = if entry.price != 0.0 {
            profit / entry.price * 100.0
        } else {
            0.0
        };
        Self {
            bot_id,
            symbol: symbol.into(),
            interval: interval.into(),
            entry,
            exit,
            duration: (exit.timestamp - entry.timestamp) / 1000,
            profit,
            roi_pct,
            strategy,
            created_at: Utc::now(),
        }
    }
}

/// Kind of a live update pushed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Candle,
    Decision,
}

/// Envelope fanned out by the event hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub symbol: String,
    pub data: Value,
}

impl HubEvent {
    pub fn candle(symbol: impl Into<String>, candle: &Candle) -> Self {
        Self {
            kind: EventKind::Candle,
            symbol: symbol.into(),
            data: json!({
                "time": candle.time,
                "open": candle.open,
                "high": candle.high,
                "low": candle.low,
                "close": candle.close,
                "volume": candle.volume,
            }),
        }
    }

    /// `timestamp_ms` is converted to seconds for chart consumers.
    pub fn decision(
        symbol: impl Into<String>,
        timestamp_ms: i64,
        price: f64,
        decision: Decision,
    ) -> Self {
        Self {
            kind: EventKind::Decision,
            symbol: symbol.into(),
            data: json!({
                "time": timestamp_ms / 1000,
                "price": price,
                "decision": decision,
            }),
        }
    }
}
