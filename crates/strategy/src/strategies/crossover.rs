use common::Decision;
use serde_json::json;

use crate::snapshot::META_PREV_RSI;
use crate::{IndicatorSnapshot, Requirements, Strategy, StrategyContext};

const FAST: usize = 9;
const SLOW: usize = 26;
const TRAILING: usize = 5;

/// Classic moving-average crossover: long while MA9 is above MA26 and price
/// is above MA9, out when both flip.
#[derive(Debug, Default, Clone, Copy)]
pub struct Crossover;

impl Crossover {
    pub const NAME: &'static str = "CROSSOVER";
}

fn averages(snapshot: &IndicatorSnapshot) -> Option<(f64, f64)> {
    if snapshot.candles < SLOW {
        return None;
    }
    Some((snapshot.sma(FAST)?, snapshot.sma(SLOW)?))
}

impl Strategy for Crossover {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "fast": FAST, "slow": SLOW })
    }

    fn requirements(&self) -> Requirements {
        Requirements { sma_periods: vec![FAST, SLOW], ..Requirements::default() }
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        let Some((fast, slow)) = averages(snapshot) else {
            return Decision::Hold;
        };
        let price = snapshot.price;
        if ctx.is_flat() {
            if fast > slow && price > fast {
                return Decision::Buy;
            }
        } else if fast < slow && price < fast {
            return Decision::Sell;
        }
        Decision::Hold
    }
}

/// Crossover with an RSI ceiling on entries and extra exits: ATR stop below
/// the entry, a close under the 5-period average, or an RSI rollover from
/// overbought.
#[derive(Debug, Clone, Copy)]
pub struct CrossoverAdvanced {
    pub max_entry_rsi: f64,
    pub overbought: f64,
    pub atr_multiplier: f64,
}

impl CrossoverAdvanced {
    pub const NAME: &'static str = "CROSSOVER_ADVANCED";
}

impl Default for CrossoverAdvanced {
    fn default() -> Self {
        Self { max_entry_rsi: 70.0, overbought: 80.0, atr_multiplier: 1.5 }
    }
}

impl Strategy for CrossoverAdvanced {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "fast": FAST,
            "slow": SLOW,
            "trailing": TRAILING,
            "max_entry_rsi": self.max_entry_rsi,
            "overbought": self.overbought,
            "atr_multiplier": self.atr_multiplier,
        })
    }

    fn requirements(&self) -> Requirements {
        Requirements { sma_periods: vec![TRAILING, FAST, SLOW], ..Requirements::default() }
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        let Some((fast, slow)) = averages(snapshot) else {
            return Decision::Hold;
        };
        let price = snapshot.price;
        let rsi = snapshot.rsi;

        if ctx.is_flat() {
            // rsi == 0 means not enough history, not oversold
            if fast > slow && price > fast && rsi > 0.0 && rsi < self.max_entry_rsi {
                return Decision::Buy;
            }
            return Decision::Hold;
        }

        let stop = ctx.last_entry_price - snapshot.atr * self.atr_multiplier;
        let stop_hit = price < stop;
        let below_trailing = snapshot.sma(TRAILING).is_some_and(|ma| price < ma);
        let rsi_rollover = snapshot
            .meta(META_PREV_RSI)
            .is_some_and(|prev| prev > self.overbought && rsi < prev);
        let crossed_down = fast < slow && price < fast;

        if stop_hit || below_trailing || rsi_rollover || crossed_down {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}
