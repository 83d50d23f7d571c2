use common::Decision;
use serde_json::json;

use crate::{IndicatorSnapshot, Requirements, Strategy, StrategyContext};

const PERIOD: usize = 2;

/// Short-term mean reversion on a 2-period RSI.
#[derive(Debug, Clone, Copy)]
pub struct Rsi2 {
    pub oversold: f64,
    pub overbought: f64,
}

impl Rsi2 {
    pub const NAME: &'static str = "RSI2";
}

impl Default for Rsi2 {
    fn default() -> Self {
        Self { oversold: 10.0, overbought: 90.0 }
    }
}

impl Strategy for Rsi2 {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "period": PERIOD, "oversold": self.oversold, "overbought": self.overbought })
    }

    fn requirements(&self) -> Requirements {
        Requirements { rsi_period: Some(PERIOD), ..Requirements::default() }
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        // 0 is "unavailable" and must not read as oversold
        if snapshot.candles < PERIOD + 1 || snapshot.rsi == 0.0 {
            return Decision::Hold;
        }
        if ctx.is_flat() && snapshot.rsi < self.oversold {
            Decision::Buy
        } else if !ctx.is_flat() && snapshot.rsi > self.overbought {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}
