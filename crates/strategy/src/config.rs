use serde::{Deserialize, Serialize};
use uuid::Uuid;

use common::{Error, Result};

use crate::window::DEFAULT_WINDOW_SIZE;

/// Top-level bot definitions file (TOML).
///
/// Example `config/bots.toml`:
/// ```toml
/// [[bot]]
/// id = "6f1c1f5e-3d55-4c8e-9a55-0a3f7d0e2b11"
/// symbol = "BTCUSDT"
/// interval = "1m"
/// strategy = "CROSSOVER"
///
/// [bot.indicators]
/// ema_periods = [9, 26]
/// rsi_period = 14
/// macd = { short = 12, long = 26, signal = 9 }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotFileConfig {
    #[serde(rename = "bot", default)]
    pub bots: Vec<BotConfig>,
}

impl BotFileConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read bot config at '{path}': {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("invalid bot config: {e}")))
    }
}

/// One bot: a strategy watching one (symbol, interval).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    pub id: Uuid,
    /// Trading pair, e.g. "BTCUSDT".
    pub symbol: String,
    /// Kline interval, e.g. "1m", "15m".
    pub interval: String,
    /// Strategy registry name, e.g. "CROSSOVER".
    pub strategy: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default)]
    pub indicators: IndicatorConfig,
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(Error::Config(format!("bot {}: empty symbol", self.id)));
        }
        if self.interval.trim().is_empty() {
            return Err(Error::Config(format!("bot {}: empty interval", self.id)));
        }
        if self.window_size == 0 {
            return Err(Error::Config(format!("bot {}: window_size must be > 0", self.id)));
        }
        self.indicators
            .validate()
            .map_err(|e| Error::Config(format!("bot {}: {e}", self.id)))
    }
}

fn default_true() -> bool {
    true
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

/// Indicator periods and thresholds a bot's snapshots are built with.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_periods: Vec<usize>,
    pub sma_periods: Vec<usize>,
    pub macd: MacdConfig,
    pub rsi_period: usize,
    pub rsi_buy: f64,
    pub rsi_sell: f64,
    pub bollinger: BollingerConfig,
    pub atr_period: usize,
    pub volatility_window: usize,
    /// Candles preceding the current one averaged for volume confirmation.
    pub volume_window: usize,
    /// ATR multiple below entry used when explaining a stop-driven exit.
    pub atr_multiplier: f64,
    /// Overrides the strategy's minimum volatility (%) for entries.
    pub min_volatility: Option<f64>,
    /// Overrides the strategy's minimum ATR for entries.
    pub min_atr: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct MacdConfig {
    pub short: usize,
    pub long: usize,
    pub signal: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct BollingerConfig {
    pub period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_periods: vec![9, 26],
            sma_periods: Vec::new(),
            macd: MacdConfig { short: 12, long: 26, signal: 9 },
            rsi_period: 14,
            rsi_buy: 10.0,
            rsi_sell: 90.0,
            bollinger: BollingerConfig { period: 20 },
            atr_period: 14,
            volatility_window: 14,
            volume_window: 10,
            atr_multiplier: 1.5,
            min_volatility: None,
            min_atr: None,
        }
    }
}

impl IndicatorConfig {
    /// Shortest configured EMA, used as the trailing exit line. 9 when none.
    pub fn trailing_ema(&self) -> usize {
        self.ema_periods.iter().copied().min().unwrap_or(9)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(p) = self.ema_periods.iter().chain(&self.sma_periods).find(|&&p| p == 0) {
            return Err(format!("moving average period must be > 0, got {p}"));
        }
        let periods = [
            ("macd.short", self.macd.short),
            ("macd.long", self.macd.long),
            ("macd.signal", self.macd.signal),
            ("rsi_period", self.rsi_period),
            ("bollinger.period", self.bollinger.period),
            ("atr_period", self.atr_period),
            ("volatility_window", self.volatility_window),
            ("volume_window", self.volume_window),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(format!("{name} must be > 0"));
        }
        if self.macd.short >= self.macd.long {
            return Err(format!(
                "macd.short ({}) must be less than macd.long ({})",
                self.macd.short, self.macd.long
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_buy) || !(0.0..=100.0).contains(&self.rsi_sell) {
            return Err("rsi_buy and rsi_sell must be within 0..=100".to_string());
        }
        if !self.atr_multiplier.is_finite() || self.atr_multiplier < 0.0 {
            return Err(format!("atr_multiplier must be >= 0, got {}", self.atr_multiplier));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [[bot]]
        id = "6f1c1f5e-3d55-4c8e-9a55-0a3f7d0e2b11"
        symbol = "BTCUSDT"
        interval = "1m"
        strategy = "CROSSOVER"

        [[bot]]
        id = "0b7f3a52-90c4-4d1e-8f57-2f6a1c9d4e03"
        symbol = "ETHUSDT"
        interval = "15m"
        strategy = "MACD_CROSS"
        active = false
        window_size = 120

        [bot.indicators]
        ema_periods = [5, 20]
        macd = { short = 9, long = 14, signal = 7 }
    "#;

    #[test]
    fn parses_bots_with_defaults() {
        let cfg = BotFileConfig::parse(SAMPLE).unwrap();
        assert_eq!(cfg.bots.len(), 2);

        let btc = &cfg.bots[0];
        assert!(btc.active);
        assert_eq!(btc.window_size, DEFAULT_WINDOW_SIZE);
        assert_eq!(btc.indicators, IndicatorConfig::default());

        let eth = &cfg.bots[1];
        assert!(!eth.active);
        assert_eq!(eth.window_size, 120);
        assert_eq!(eth.indicators.ema_periods, vec![5, 20]);
        assert_eq!(eth.indicators.macd, MacdConfig { short: 9, long: 14, signal: 7 });
        assert_eq!(eth.indicators.rsi_period, 14);
    }

    #[test]
    fn rejects_malformed_file() {
        let err = BotFileConfig::parse("[[bot]]\nsymbol = 3").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn validate_rejects_inverted_macd() {
        let mut ind = IndicatorConfig::default();
        ind.macd = MacdConfig { short: 26, long: 12, signal: 9 };
        assert!(ind.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_period() {
        let mut ind = IndicatorConfig::default();
        ind.ema_periods = vec![9, 0];
        assert!(ind.validate().is_err());

        let mut ind = IndicatorConfig::default();
        ind.atr_period = 0;
        assert!(ind.validate().is_err());
    }

    #[test]
    fn trailing_ema_is_shortest_period() {
        let mut ind = IndicatorConfig::default();
        ind.ema_periods = vec![26, 5, 9];
        assert_eq!(ind.trailing_ema(), 5);
        ind.ema_periods.clear();
        assert_eq!(ind.trailing_ema(), 9);
    }

    #[test]
    fn shipped_bot_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/bots.toml");
        let file = BotFileConfig::load(path).unwrap();
        assert_eq!(file.bots.len(), 3);
        for bot in &file.bots {
            bot.validate().unwrap();
            crate::build_strategy(&bot.strategy, &bot.indicators).unwrap();
        }
        assert!(!file.bots[2].active);
        assert_eq!(file.bots[2].indicators.rsi_buy, 5.0);
    }
}
