pub mod binance;
pub mod connector;
pub mod hub;
pub mod lifecycle;
pub mod report;
pub mod runtime;

pub use binance::BinanceMarketData;
pub use connector::{CandleBuilder, ClosedCandle, ConnectorSettings, MarketDataConnector};
pub use hub::{EventHub, Subscription};
pub use lifecycle::{BotHandle, BotRegistry, Engine};
pub use report::SymbolPerformance;
pub use runtime::{PositionState, Ports, RuntimeState, StrategyRuntime};
