use common::Decision;
use serde_json::json;

use crate::snapshot::META_AVG_VOLUME;
use crate::{IndicatorSnapshot, Strategy, StrategyContext};

/// Enter on a volume burst well above the recent average; exit once volume
/// drops back below the average.
#[derive(Debug, Clone, Copy)]
pub struct VolumeSpike {
    pub spike_factor: f64,
}

impl VolumeSpike {
    pub const NAME: &'static str = "VOLUME_SPIKE";
}

impl Default for VolumeSpike {
    fn default() -> Self {
        Self { spike_factor: 2.0 }
    }
}

impl Strategy for VolumeSpike {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn parameters(&self) -> serde_json::Value {
        json!({ "spike_factor": self.spike_factor })
    }

    fn evaluate(&self, snapshot: &IndicatorSnapshot, ctx: &StrategyContext) -> Decision {
        let avg = match snapshot.meta(META_AVG_VOLUME) {
            Some(avg) if avg > 0.0 && snapshot.volume > 0.0 => avg,
            _ => return Decision::Hold,
        };
        if ctx.is_flat() && snapshot.volume > avg * self.spike_factor {
            Decision::Buy
        } else if !ctx.is_flat() && snapshot.volume < avg {
            Decision::Sell
        } else {
            Decision::Hold
        }
    }
}
