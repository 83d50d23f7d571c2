use common::Candle;

use super::sma;

/// Average True Range: simple average of
/// `max(high - low, |high - prev_close|, |low - prev_close|)` over every bar
/// after the first. Needs at least 2 bars, else 0.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64]) -> f64 {
    let n = closes.len().min(highs.len()).min(lows.len());
    if n < 2 {
        return 0.0;
    }
    let ranges: Vec<f64> = (1..n)
        .map(|i| true_range(highs[i], lows[i], closes[i - 1]))
        .collect();
    sma(&ranges)
}

/// [`atr`] over the high/low/close of each candle.
pub fn atr_from_candles(candles: &[Candle]) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }
    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| true_range(w[1].high, w[1].low, w[0].close))
        .collect();
    sma(&ranges)
}

fn true_range(high: f64, low: f64, prev_close: f64) -> f64 {
    (high - low)
        .max((high - prev_close).abs())
        .max((low - prev_close).abs())
}
