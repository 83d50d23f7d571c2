use common::Decision;
use serde_json::json;

use crate::snapshot::META_AVG_VOLUME;
use crate::{IndicatorSnapshot, Requirements, Strategy, StrategyContext};

const FAN: [usize; 7] = [10, 15, 20, 25, 30, 35, 40];

/// Enter when seven EMAs fan out in bullish order (shortest on top) and the
/// candle's volume beats the recent average; leave as soon as the fan breaks.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmaFan;

impl EmaFan {
    pub const NAME: &'static str = "EMA_FAN";

    fn aligned(snapshot: &IndicatorSnapshot) -> Option<bool> {
        let values = FAN
            .iter()
            .map(|&p| snapshot.ema(p))
            .collect::<Option<Vec<f64>>>()?;
        Some(values.windows(2).all(|w| w[0] > w[1]))
    }
}

impl Strategy for EmaFan {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "periods": FAN })
    }

    fn requirements(&self) -> Requirements {
        Requirements { ema_periods: FAN.to_vec(), ..Requirements::default() }
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        if snapshot.candles < FAN[FAN.len() - 1] {
            return Decision::Hold;
        }
        let Some(aligned) = Self::aligned(snapshot) else {
            return Decision::Hold;
        };

        if !aligned {
            return if ctx.is_flat() { Decision::Hold } else { Decision::Sell };
        }

        let volume_confirmed = snapshot
            .meta(META_AVG_VOLUME)
            .is_some_and(|avg| snapshot.volume > avg);
        if ctx.is_flat() && volume_confirmed {
            Decision::Buy
        } else {
            Decision::Hold
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{flat_context, long_context, snapshot};

    fn fan(descending: bool) -> IndicatorSnapshot {
        let mut s = snapshot(150.0);
        for (i, p) in FAN.iter().enumerate() {
            let offset = i as f64;
            let v = if descending { 140.0 - offset } else { 140.0 + offset };
            s.emas.insert(*p, v);
        }
        s.volume = 20.0;
        s.meta.insert(META_AVG_VOLUME.into(), 10.0);
        s
    }

    #[test]
    fn buys_on_bullish_fan_with_volume() {
        assert_eq!(EmaFan.evaluate(&fan(true), &flat_context()), Decision::Buy);
    }

    #[test]
    fn needs_volume_confirmation() {
        let mut s = fan(true);
        s.volume = 5.0;
        assert_eq!(EmaFan.evaluate(&s, &flat_context()), Decision::Hold);
    }

    #[test]
    fn sells_when_fan_breaks() {
        assert_eq!(EmaFan.evaluate(&fan(false), &long_context(100.0)), Decision::Sell);
        assert_eq!(EmaFan.evaluate(&fan(false), &flat_context()), Decision::Hold);
    }

    #[test]
    fn holds_while_fan_intact_in_position() {
        assert_eq!(EmaFan.evaluate(&fan(true), &long_context(100.0)), Decision::Hold);
    }

    #[test]
    fn holds_on_short_history() {
        let mut s = fan(true);
        s.candles = 39;
        assert_eq!(EmaFan.evaluate(&s, &flat_context()), Decision::Hold);
    }
}
