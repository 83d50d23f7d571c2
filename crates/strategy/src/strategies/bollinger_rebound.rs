use common::Decision;
use serde_json::json;

use crate::{IndicatorSnapshot, Strategy, StrategyContext};

/// Buy a close under the lower band, sell a close over the upper band.
/// Bands narrower than `min_width` (a stalled market) are ignored.
#[derive(Debug, Clone, Copy)]
pub struct BollingerRebound {
    pub min_width: f64,
}

impl BollingerRebound {
    pub const NAME: &'static str = "BB_REBOUND";
}

impl Default for BollingerRebound {
    fn default() -> Self {
        Self { min_width: 0.5 }
    }
}

impl Strategy for BollingerRebound {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "min_width": self.min_width })
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        let (lower, upper) = (snapshot.bb_lower, snapshot.bb_upper);
        if snapshot.bb_width < self.min_width || lower == 0.0 || upper == 0.0 {
            return Decision::Hold;
        }
        if ctx.is_flat() && snapshot.price < lower {
            Decision::Buy
        } else if !ctx.is_flat() && snapshot.price > upper {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}
