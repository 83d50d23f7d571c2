use common::{Error, Result};

use crate::config::IndicatorConfig;
use crate::strategies::{
    BollingerRebound, Crossover, CrossoverAdvanced, EmaFan, MacdCross, Rsi2, VolumeSpike,
};
use crate::Strategy;

type Constructor = fn(&IndicatorConfig) -> Box<dyn Strategy>;

/// Registration table: strategy name → constructor.
const STRATEGIES: &[(&str, Constructor)] = &[
    (Crossover::NAME, crossover),
    (CrossoverAdvanced::NAME, crossover_advanced),
    (EmaFan::NAME, ema_fan),
    (Rsi2::NAME, rsi2),
    (MacdCross::NAME, macd_cross),
    (BollingerRebound::NAME, bollinger_rebound),
    (VolumeSpike::NAME, volume_spike),
];

/// Instantiate a strategy by name. Unknown names are a configuration error.
pub fn build_strategy(name: &str, cfg: &IndicatorConfig) -> Result<Box<dyn Strategy>> {
    STRATEGIES
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, build)| build(cfg))
        .ok_or_else(|| Error::UnknownStrategy(name.to_string()))
}

/// Names of every registered strategy.
pub fn available() -> impl Iterator<Item = &'static str> {
    STRATEGIES.iter().map(|(name, _)| *name)
}

fn crossover(_: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(Crossover)
}

fn crossover_advanced(cfg: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(CrossoverAdvanced {
        atr_multiplier: cfg.atr_multiplier,
        ..CrossoverAdvanced::default()
    })
}

fn ema_fan(_: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(EmaFan)
}

fn rsi2(cfg: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(Rsi2 { oversold: cfg.rsi_buy, overbought: cfg.rsi_sell })
}

fn macd_cross(_: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(MacdCross)
}

fn bollinger_rebound(_: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(BollingerRebound::default())
}

fn volume_spike(_: &IndicatorConfig) -> Box<dyn Strategy> {
    Box::new(VolumeSpike::default())
}
