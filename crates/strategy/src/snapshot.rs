use std::collections::{BTreeMap, BTreeSet};

use common::Candle;

use crate::config::IndicatorConfig;
use crate::indicators::{
    atr_from_candles, average_volume, bollinger_bands, ema, macd, moving_average, rsi, volatility,
};
use crate::Requirements;

pub const META_AVG_VOLUME: &str = "avg_volume";
pub const META_PREV_MACD: &str = "prev_macd";
pub const META_PREV_SIGNAL: &str = "prev_signal";
pub const META_PREV_RSI: &str = "prev_rsi";

/// Every indicator value one decision is based on, computed from the same
/// window at the same instant.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    /// Close time of the latest candle, epoch seconds.
    pub timestamp: i64,
    pub price: f64,
    pub volume: f64,
    /// Number of candles the snapshot was built from.
    pub candles: usize,
    pub emas: BTreeMap<usize, f64>,
    pub smas: BTreeMap<usize, f64>,
    pub macd: f64,
    pub macd_signal: f64,
    /// 0 means not enough data.
    pub rsi: f64,
    pub atr: f64,
    pub volatility: f64,
    pub bb_upper: f64,
    pub bb_middle: f64,
    pub bb_lower: f64,
    pub bb_width: f64,
    /// Optional values; absent keys mean "not available".
    pub meta: BTreeMap<String, f64>,
}

impl IndicatorSnapshot {
    pub fn ema(&self, period: usize) -> Option<f64> {
        self.emas.get(&period).copied()
    }

    pub fn sma(&self, period: usize) -> Option<f64> {
        self.smas.get(&period).copied()
    }

    pub fn meta(&self, key: &str) -> Option<f64> {
        self.meta.get(key).copied()
    }

    /// Flat name → value map recorded in the decision log.
    pub fn indicator_values(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::from([
            ("price".to_string(), self.price),
            ("volume".to_string(), self.volume),
            ("macd".to_string(), self.macd),
            ("macd_signal".to_string(), self.macd_signal),
            ("rsi".to_string(), self.rsi),
            ("atr".to_string(), self.atr),
            ("volatility".to_string(), self.volatility),
            ("bb_upper".to_string(), self.bb_upper),
            ("bb_lower".to_string(), self.bb_lower),
            ("bb_width".to_string(), self.bb_width),
        ]);
        out.extend(self.emas.iter().map(|(p, v)| (format!("ema_{p}"), *v)));
        out.extend(self.smas.iter().map(|(p, v)| (format!("sma_{p}"), *v)));
        out.extend(self.meta.iter().map(|(k, v)| (k.clone(), *v)));
        out
    }
}

/// Build the snapshot for the latest candle in `candles` (oldest first).
///
/// Returns `None` with fewer than 2 candles. Indicators lacking history fall
/// back to their neutral values; optional `meta` entries are simply omitted.
pub fn build_snapshot(
    candles: &[Candle],
    cfg: &IndicatorConfig,
    req: &Requirements,
) -> Option<IndicatorSnapshot> {
    let n = candles.len();
    if n < 2 {
        return None;
    }
    let last = candles[n - 1];
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

    let ema_periods: BTreeSet<usize> = cfg.ema_periods.iter().chain(&req.ema_periods).copied().collect();
    let sma_periods: BTreeSet<usize> = cfg.sma_periods.iter().chain(&req.sma_periods).copied().collect();
    let emas = ema_periods.into_iter().map(|p| (p, ema(&closes, p))).collect();
    let smas = sma_periods.into_iter().map(|p| (p, moving_average(&closes, p))).collect();

    let mut meta = BTreeMap::new();

    let (macd_value, macd_signal) = match macd(&closes, cfg.macd.short, cfg.macd.long, cfg.macd.signal) {
        Some(series) => {
            if let Some((prev_macd, prev_signal)) = series.previous() {
                meta.insert(META_PREV_MACD.to_string(), prev_macd);
                meta.insert(META_PREV_SIGNAL.to_string(), prev_signal);
            }
            series.last().unwrap_or_default()
        }
        None => (0.0, 0.0),
    };

    let rsi_period = req.rsi_period.unwrap_or(cfg.rsi_period);
    let rsi_value = trailing_rsi(&closes, rsi_period);
    if n - 1 > rsi_period {
        meta.insert(META_PREV_RSI.to_string(), trailing_rsi(&closes[..n - 1], rsi_period));
    }

    let atr = atr_from_candles(tail(candles, cfg.atr_period + 1));
    let volatility = volatility(tail(&closes, cfg.volatility_window));
    let bands = bollinger_bands(&closes, cfg.bollinger.period);

    let preceding = &candles[..n - 1];
    meta.insert(
        META_AVG_VOLUME.to_string(),
        average_volume(tail(preceding, cfg.volume_window)),
    );

    Some(IndicatorSnapshot {
        timestamp: last.time,
        price: last.close,
        volume: last.volume,
        candles: n,
        emas,
        smas,
        macd: macd_value,
        macd_signal,
        rsi: rsi_value,
        atr,
        volatility,
        bb_upper: bands.upper,
        bb_middle: bands.middle,
        bb_lower: bands.lower,
        bb_width: bands.width(),
        meta,
    })
}

/// RSI over the most recent `period` deltas.
fn trailing_rsi(closes: &[f64], period: usize) -> f64 {
    rsi(tail(closes, period + 1), period)
}

fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}
