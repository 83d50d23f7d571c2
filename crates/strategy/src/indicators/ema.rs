/// Exponential moving average series with alpha = 2 / (period + 1),
/// seeded by the first element. Same length as `prices`; empty for empty input.
pub fn ema_series(prices: &[f64], period: usize) -> Vec<f64> {
    let Some(&first) = prices.first() else {
        return Vec::new();
    };
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(prices.len());
    let mut value = first;
    out.push(value);
    for &price in &prices[1..] {
        value = alpha * price + (1.0 - alpha) * value;
        out.push(value);
    }
    out
}

/// Latest value of [`ema_series`]. 0 for empty input.
pub fn ema(prices: &[f64], period: usize) -> f64 {
    ema_series(prices, period).last().copied().unwrap_or(0.0)
}
