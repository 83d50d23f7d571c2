mod rest;
mod stream;

pub use rest::BinanceMarketData;
pub use stream::parse_kline_event;
