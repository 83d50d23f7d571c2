pub mod calibration;
pub mod config;
pub mod indicators;
pub mod registry;
pub mod snapshot;
pub mod strategies;
pub mod window;

pub use calibration::{calibrate, trend_signal, Calibration};
pub use config::{BollingerConfig, BotConfig, BotFileConfig, IndicatorConfig, MacdConfig};
pub use registry::{available, build_strategy};
pub use snapshot::{build_snapshot, IndicatorSnapshot};
pub use window::{CandleWindow, DEFAULT_WINDOW_SIZE};

use common::{Account, Decision};
use uuid::Uuid;

/// Version reported in audit records for every built-in strategy.
pub const STRATEGY_VERSION: &str = "1.0.1";

/// Position-side view of a bot handed to a strategy on every evaluation.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub account: Account,
    pub bot_id: Uuid,
    pub symbol: String,
    /// 0 when flat, 1 when holding a position.
    pub position_quantity: u8,
    pub last_entry_price: f64,
    /// Entry time in epoch milliseconds.
    pub last_entry_timestamp: i64,
}

impl StrategyContext {
    pub fn is_flat(&self) -> bool {
        self.position_quantity == 0
    }
}

/// Extra indicator series a strategy reads from the snapshot on top of the
/// bot's configured ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirements {
    pub ema_periods: Vec<usize>,
    pub sma_periods: Vec<usize>,
    /// Replaces the configured RSI period when set.
    pub rsi_period: Option<usize>,
}

/// Minimum market activity required before a BUY is acted upon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFilter {
    /// Minimum volatility in percent of the mean price.
    pub min_volatility: f64,
    pub min_atr: f64,
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self { min_volatility: 0.1, min_atr: 0.01 }
    }
}

impl EntryFilter {
    /// Apply per-bot overrides from the indicator config.
    pub fn with_overrides(self, cfg: &IndicatorConfig) -> Self {
        Self {
            min_volatility: cfg.min_volatility.unwrap_or(self.min_volatility),
            min_atr: cfg.min_atr.unwrap_or(self.min_atr),
        }
    }

    /// `Err` carries the rejection reason.
    pub fn check(&self, snapshot: &IndicatorSnapshot) -> Result<(), String> {
        if snapshot.volatility < self.min_volatility {
            return Err(format!(
                "volatility {:.4} below {:.4}",
                snapshot.volatility, self.min_volatility
            ));
        }
        if snapshot.atr < self.min_atr {
            return Err(format!("atr {:.4} below {:.4}", snapshot.atr, self.min_atr));
        }
        Ok(())
    }
}

/// All strategy implementations must satisfy this trait.
///
/// Strategies are stateless: everything that changes between candles lives
/// in the snapshot or the context.
pub trait Strategy: Send + Sync {
    /// Registry name, e.g. "CROSSOVER".
    fn name(&self) -> &'static str;

    fn version(&self) -> &'static str {
        STRATEGY_VERSION
    }

    /// Tunables recorded with every decision.
    fn parameters(&self) -> serde_json::Value {
        serde_json::Value::Object(Default::default())
    }

    fn requirements(&self) -> Requirements {
        Requirements::default()
    }

    fn entry_filter(&self) -> EntryFilter {
        EntryFilter::default()
    }

    /// BUY is only meaningful from a flat context and SELL only from an open
    /// position; anything else must come back as HOLD.
    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn flat_context() -> StrategyContext {
        StrategyContext {
            account: Account { id: Uuid::nil(), name: "test".into() },
            bot_id: Uuid::nil(),
            symbol: "BTCUSDT".into(),
            position_quantity: 0,
            last_entry_price: 0.0,
            last_entry_timestamp: 0,
        }
    }

    pub fn long_context(entry_price: f64) -> StrategyContext {
        StrategyContext {
            position_quantity: 1,
            last_entry_price: entry_price,
            last_entry_timestamp: 1_000,
            ..flat_context()
        }
    }

    pub fn snapshot(price: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: 0,
            price,
            volume: 0.0,
            candles: 240,
            emas: Default::default(),
            smas: Default::default(),
            macd: 0.0,
            macd_signal: 0.0,
            rsi: 50.0,
            atr: 0.0,
            volatility: 0.0,
            bb_upper: 0.0,
            bb_middle: 0.0,
            bb_lower: 0.0,
            bb_width: 0.0,
            meta: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::snapshot;
    use super::*;

    #[test]
    fn entry_filter_rejects_quiet_market() {
        let mut s = snapshot(100.0);
        s.volatility = 0.05;
        s.atr = 1.0;
        assert!(EntryFilter::default().check(&s).is_err());

        s.volatility = 0.5;
        s.atr = 0.001;
        assert!(EntryFilter::default().check(&s).is_err());

        s.atr = 0.5;
        assert!(EntryFilter::default().check(&s).is_ok());
    }

    #[test]
    fn entry_filter_overrides_from_config() {
        let cfg = IndicatorConfig {
            min_volatility: Some(0.0),
            ..IndicatorConfig::default()
        };
        let filter = EntryFilter::default().with_overrides(&cfg);
        assert_eq!(filter.min_volatility, 0.0);
        assert_eq!(filter.min_atr, 0.01);
    }
}
