mod bots;
mod health;
mod ws;

pub use bots::api_router;
pub use health::health_router;
pub use ws::ws_router;
