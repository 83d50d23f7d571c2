use common::Decision;
use serde::Serialize;

use crate::indicators::moving_average;
use crate::window::CandleWindow;

const FAST: usize = 9;
const SLOW: usize = 26;

/// Where the current trend most plausibly started, reconstructed from a
/// freshly backfilled window. Informational only: never opens a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Calibration {
    /// Close of the candle where the latest trend began.
    pub reference_price: f64,
    /// Direction of that trend, HOLD when no reversal was found.
    pub signal: Decision,
    /// Value of the window's total-candle counter at the reversal candle.
    pub calibrated_at: u64,
}

/// MA9/MA26 trend reading of a close series: BUY above both averages in an
/// uptrend, SELL below both in a downtrend, HOLD otherwise or with fewer than
/// 26 closes.
pub fn trend_signal(closes: &[f64]) -> Decision {
    if closes.len() < SLOW {
        return Decision::Hold;
    }
    let fast = moving_average(closes, FAST);
    let slow = moving_average(closes, SLOW);
    let price = closes[closes.len() - 1];
    if fast > slow && price > fast {
        Decision::Buy
    } else if fast < slow && price < fast {
        Decision::Sell
    } else {
        Decision::Hold
    }
}

/// Scan the window backward for the most recent trend reversal.
///
/// Each candle is classified by [`trend_signal`] over the closes up to and
/// including it. The reversal is the earliest candle of the latest run of one
/// non-HOLD signal that is preceded by the opposite signal. Without one the
/// result is HOLD at the latest candle. `None` for an empty window.
pub fn calibrate(window: &CandleWindow) -> Option<Calibration> {
    let closes = window.closes();
    let n = closes.len();
    let last_price = *closes.last()?;
    let total = window.total_candles();
    let global_index = |i: usize| total - (n - 1 - i) as u64;

    let mut latest: Option<(Decision, usize)> = None;
    for i in (0..n).rev() {
        let signal = trend_signal(&closes[..=i]);
        if signal == Decision::Hold {
            continue;
        }
        match latest {
            Some((later, start)) if later != signal => {
                return Some(Calibration {
                    reference_price: closes[start],
                    signal: later,
                    calibrated_at: global_index(start),
                });
            }
            _ => latest = Some((signal, i)),
        }
    }

    Some(Calibration {
        reference_price: last_price,
        signal: Decision::Hold,
        calibrated_at: total,
    })
}
