use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use common::{ExecutionLog, ExecutionLogStore, Result};

/// Aggregate results of every closed trade on one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    /// Trades that did not make money, break-even included.
    pub losses: usize,
    pub total_profit: f64,
    pub avg_roi_pct: f64,
    pub win_rate_pct: f64,
}

/// Group closed trades by symbol, sorted by symbol.
pub fn summarize(executions: &[ExecutionLog]) -> Vec<SymbolPerformance> {
    let mut by_symbol: BTreeMap<&str, (SymbolPerformance, f64)> = BTreeMap::new();
    for exec in executions {
        let (perf, roi_total) = by_symbol.entry(exec.symbol.as_str()).or_default();
        perf.trades += 1;
        perf.total_profit += exec.profit;
        *roi_total += exec.roi_pct;
        if exec.profit > 0.0 {
            perf.wins += 1;
        } else {
            perf.losses += 1;
        }
    }

    by_symbol
        .into_iter()
        .map(|(symbol, (mut perf, roi_total))| {
            let trades = perf.trades as f64;
            perf.symbol = symbol.to_string();
            perf.avg_roi_pct = roi_total / trades;
            perf.win_rate_pct = perf.wins as f64 / trades * 100.0;
            perf
        })
        .collect()
}

/// Load every execution and summarize it.
pub async fn performance(store: &dyn ExecutionLogStore) -> Result<Vec<SymbolPerformance>> {
    Ok(summarize(&store.all().await?))
}

/// Recompute the summary in the background and log it. Never blocks the
/// caller's decision loop.
pub fn spawn_recompute(store: Arc<dyn ExecutionLogStore>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match performance(store.as_ref()).await {
            Ok(summary) => {
                for perf in summary {
                    info!(
                        symbol = %perf.symbol,
                        trades = perf.trades,
                        wins = perf.wins,
                        losses = perf.losses,
                        total_profit = perf.total_profit,
                        avg_roi_pct = perf.avg_roi_pct,
                        win_rate_pct = perf.win_rate_pct,
                        "performance summary"
                    );
                }
            }
            Err(e) => error!(error = %e, "failed to load execution logs for performance summary"),
        }
    })
}
