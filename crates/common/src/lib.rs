pub mod config;
pub mod error;
pub mod exchange;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use exchange::{MarketData, TickStream};
pub use store::{DecisionLogStore, ExecutionLogStore, PositionStore};
pub use types::*;
