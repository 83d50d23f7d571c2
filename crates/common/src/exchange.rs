use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{Candle, KlineTick, Result};

/// Live kline updates for one (symbol, interval). An `Err` item or the end of
/// the stream means the session is over and the caller should reconnect.
pub type TickStream = BoxStream<'static, Result<KlineTick>>;

/// Abstraction over the exchange's market data.
///
/// `BinanceMarketData` implements this against the public Binance endpoints.
/// Tests script it with canned candles and ticks.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Get the latest price for a trading pair.
    async fn current_price(&self, symbol: &str) -> Result<f64>;

    /// Most recent `limit` closed candles, oldest first.
    async fn historical_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<Candle>>;

    /// Open a streaming session of partial/final kline ticks.
    async fn subscribe(&self, symbol: &str, interval: &str) -> Result<TickStream>;
}
