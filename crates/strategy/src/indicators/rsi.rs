/// RSI (Relative Strength Index).
///
/// Average gain over average loss across the first `period` price changes of
/// `prices`. Callers wanting the RSI "as of now" pass the trailing
/// `period + 1` closes.
///
/// Returns 0 when there are fewer than `period + 1` prices. That 0 means
/// "unavailable", not "oversold". Returns 100 when the average loss is exactly 0.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 0.0;
    }

    let (gain, loss) = prices[..=period]
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(gain, loss), change| {
            if change > 0.0 {
                (gain + change, loss)
            } else {
                (gain, loss - change)
            }
        });

    let avg_gain = gain / period as f64;
    let avg_loss = loss / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_returns_zero_when_insufficient_data() {
        // Need at least period+1 = 15 values
        let prices = vec![100.0; 14];
        assert_eq!(rsi(&prices, 14), 0.0);
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        // Strictly increasing prices → RSI = 100
        let prices = vec![10.0, 11.0, 12.0, 13.0, 14.0];
        assert_eq!(rsi(&prices, 3), 100.0);
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let prices = vec![14.0, 13.0, 12.0, 11.0, 10.0];
        let value = rsi(&prices, 3);
        assert!((value - 0.0).abs() < 1e-6, "Expected ~0, got {value}");
    }

    #[test]
    fn rsi_flat_prices_count_as_no_loss() {
        assert_eq!(rsi(&[5.0; 10], 4), 100.0);
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        // +2, -2 → avg gain == avg loss
        let value = rsi(&[10.0, 12.0, 10.0], 2);
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_uses_only_first_period_changes() {
        // The trailing crash is past the first 2 changes and must not count.
        let value = rsi(&[10.0, 11.0, 12.0, 1.0], 2);
        assert_eq!(value, 100.0);
    }

    #[test]
    fn rsi_known_value_in_range() {
        let prices = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.15, 43.61, 44.33, 44.83, 45.10,
            45.15, 44.34, 44.09,
        ];
        let v = rsi(&prices, 14);
        assert!(v > 0.0 && v < 100.0, "RSI out of range: {v}");
    }
}
