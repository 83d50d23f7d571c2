use common::Decision;
use serde_json::json;

use crate::snapshot::{META_PREV_MACD, META_PREV_SIGNAL};
use crate::{IndicatorSnapshot, Strategy, StrategyContext};

/// MACD line crossing its signal line between the previous and current candle.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacdCross;

impl MacdCross {
    pub const NAME: &'static str = "MACD_CROSS";
}

impl Strategy for MacdCross {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "cross": "macd/signal" })
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        let (Some(prev_macd), Some(prev_signal)) =
            (snapshot.meta(META_PREV_MACD), snapshot.meta(META_PREV_SIGNAL))
        else {
            return Decision::Hold;
        };
        let (macd, signal) = (snapshot.macd, snapshot.macd_signal);

        if ctx.is_flat() && prev_macd < prev_signal && macd > signal {
            Decision::Buy
        } else if !ctx.is_flat() && prev_macd > prev_signal && macd < signal {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}
