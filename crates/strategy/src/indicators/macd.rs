use super::ema::ema_series;

/// MACD (Moving Average Convergence/Divergence) series.
///
/// MACD line = EMA(short) − EMA(long), signal = EMA(macd_line, signal_period),
/// histogram = MACD − signal. All three have the length of the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    /// `(macd, signal)` of the latest bar.
    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.macd.last()?, *self.signal.last()?))
    }

    /// `(macd, signal)` of the bar before the latest one.
    pub fn previous(&self) -> Option<(f64, f64)> {
        let n = self.macd.len();
        if n < 2 {
            return None;
        }
        Some((self.macd[n - 2], self.signal[n - 2]))
    }
}

/// Compute the MACD series from close prices (oldest first).
/// Returns `None` if there are fewer than `long` prices.
pub fn macd(prices: &[f64], short: usize, long: usize, signal: usize) -> Option<Macd> {
    if prices.is_empty() || prices.len() < long {
        return None;
    }

    let ema_short = ema_series(prices, short);
    let ema_long = ema_series(prices, long);

    let macd_line: Vec<f64> = ema_short
        .iter()
        .zip(&ema_long)
        .map(|(s, l)| s - l)
        .collect();
    let signal_line = ema_series(&macd_line, signal);
    let histogram = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Some(Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_up(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
    }

    #[test]
    fn macd_returns_none_with_insufficient_data() {
        let prices = vec![100.0; 25];
        assert!(macd(&prices, 12, 26, 9).is_none());
    }

    #[test]
    fn macd_returns_series_with_sufficient_data() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let m = macd(&prices, 12, 26, 9).unwrap();
        assert_eq!(m.macd.len(), 60);
        assert_eq!(m.signal.len(), 60);
        assert_eq!(m.histogram.len(), 60);
    }

    #[test]
    fn macd_positive_on_steady_uptrend() {
        let m = macd(&trending_up(40), 3, 6, 3).unwrap();
        let (line, _) = m.last().unwrap();
        assert!(line > 0.0, "fast EMA should sit above slow EMA, got {line}");
    }

    #[test]
    fn histogram_is_macd_minus_signal() {
        let m = macd(&trending_up(30), 3, 6, 3).unwrap();
        for i in 0..30 {
            assert_eq!(m.histogram[i], m.macd[i] - m.signal[i]);
        }
    }

    #[test]
    fn previous_needs_two_bars() {
        let m = macd(&[100.0], 1, 1, 1).unwrap();
        assert!(m.previous().is_none());
        assert!(m.last().is_some());
    }
}
