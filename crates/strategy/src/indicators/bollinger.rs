use super::{sma, std_dev_pop, tail};

const NUM_STD: f64 = 2.0;

/// Bollinger Bands: mean ± 2 population standard deviations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Absolute distance between the outer bands.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Bands over the trailing `period` prices (all prices when fewer).
/// All zero for empty input.
pub fn bollinger_bands(prices: &[f64], period: usize) -> Bands {
    let window = tail(prices, period);
    if window.is_empty() {
        return Bands::default();
    }
    let middle = sma(window);
    let std = std_dev_pop(window, middle);
    Bands {
        upper: middle + NUM_STD * std,
        middle,
        lower: middle - NUM_STD * std,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_zero_bands() {
        assert_eq!(bollinger_bands(&[], 20), Bands::default());
    }

    #[test]
    fn flat_prices_collapse_the_bands() {
        let b = bollinger_bands(&[100.0; 30], 20);
        assert_eq!(b.upper, 100.0);
        assert_eq!(b.lower, 100.0);
        assert_eq!(b.width(), 0.0);
    }

    #[test]
    fn bands_use_trailing_window_only() {
        let mut prices = vec![1000.0; 10];
        prices.extend([8.0, 12.0, 8.0, 12.0]);
        let b = bollinger_bands(&prices, 4);
        // mean 10, std 2
        assert_eq!(b.middle, 10.0);
        assert_eq!(b.upper, 14.0);
        assert_eq!(b.lower, 6.0);
        assert_eq!(b.width(), 8.0);
    }
}
