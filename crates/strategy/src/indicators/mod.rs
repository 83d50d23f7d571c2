//! Pure indicator functions over price series (oldest first).
//!
//! Every function is deterministic and never fails on short input: when there
//! is not enough data it returns its documented neutral value instead.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;

pub use atr::{atr, atr_from_candles};
pub use bollinger::{bollinger_bands, Bands};
pub use ema::{ema, ema_series};
pub use macd::{macd, Macd};
pub use rsi::rsi;

use common::Candle;

/// Arithmetic mean. 0 for empty input.
pub fn sma(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// SMA of the trailing `period` values, or of everything available when the
/// series is shorter than `period`.
pub fn moving_average(prices: &[f64], period: usize) -> f64 {
    if prices.len() < period {
        return sma(prices);
    }
    sma(&prices[prices.len() - period..])
}

/// Population standard deviation as a percentage of the mean.
/// 0 for empty input or a zero mean.
pub fn volatility(prices: &[f64]) -> f64 {
    let mean = sma(prices);
    if prices.is_empty() || mean == 0.0 {
        return 0.0;
    }
    std_dev_pop(prices, mean) / mean * 100.0
}

/// Mean volume of the given candles. 0 for empty input.
pub fn average_volume(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    candles.iter().map(|c| c.volume).sum::<f64>() / candles.len() as f64
}

pub(crate) fn std_dev_pop(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Trailing `n` elements (all of them when shorter).
pub(crate) fn tail<T>(values: &[T], n: usize) -> &[T] {
    &values[values.len().saturating_sub(n)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_of_empty_is_zero() {
        assert_eq!(sma(&[]), 0.0);
    }

    #[test]
    fn moving_average_uses_trailing_window() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(moving_average(&prices, 2), 4.5);
    }

    #[test]
    fn moving_average_falls_back_to_all_available() {
        let prices = [2.0, 4.0];
        assert_eq!(moving_average(&prices, 9), 3.0);
    }

    #[test]
    fn volatility_is_relative_std_dev() {
        // mean 10, population std dev 2 → 20%
        let prices = [8.0, 12.0, 8.0, 12.0];
        assert!((volatility(&prices) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn volatility_neutral_on_empty_or_zero_mean() {
        assert_eq!(volatility(&[]), 0.0);
        assert_eq!(volatility(&[-1.0, 1.0]), 0.0);
    }

    #[test]
    fn flat_prices_have_no_volatility() {
        assert_eq!(volatility(&[50.0; 20]), 0.0);
    }
}
