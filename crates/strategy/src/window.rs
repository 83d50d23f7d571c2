use std::collections::VecDeque;

use common::Candle;

/// Default number of closed candles kept per bot.
pub const DEFAULT_WINDOW_SIZE: usize = 240;

/// Fixed-capacity FIFO of closed candles, oldest first.
///
/// `total_candles` counts every candle ever pushed and never decreases,
/// independently of eviction.
#[derive(Debug, Clone)]
pub struct CandleWindow {
    candles: VecDeque<Candle>,
    capacity: usize,
    total_candles: u64,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            candles: VecDeque::with_capacity(capacity + 1),
            capacity,
            total_candles: 0,
        }
    }

    /// Append a closed candle, evicting the oldest one on overflow.
    pub fn push(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        self.total_candles += 1;
        while self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_candles(&self) -> u64 {
        self.total_candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Copy of the current contents, oldest first.
    pub fn to_vec(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

impl Default for CandleWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
