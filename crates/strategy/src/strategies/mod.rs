//! Built-in strategy variants. Each one is a stateless reading of an
//! [`IndicatorSnapshot`](crate::IndicatorSnapshot).

mod bollinger_rebound;
mod crossover;
mod ema_fan;
mod macd_cross;
mod rsi2;
mod volume_spike;

pub use bollinger_rebound::BollingerRebound;
pub use crossover::{Crossover, CrossoverAdvanced};
pub use ema_fan::EmaFan;
pub use macd_cross::MacdCross;
pub use rsi2::Rsi2;
pub use volume_spike::VolumeSpike;
