pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::{ExecutionLogStore, Result};
use engine::{BotRegistry, Engine, EventHub};

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: BotRegistry,
    pub hub: EventHub,
    pub executions: Arc<dyn ExecutionLogStore>,
}

impl From<&Engine> for AppState {
    fn from(engine: &Engine) -> Self {
        Self {
            registry: engine.registry().clone(),
            hub: engine.hub().clone(),
            executions: engine.ports().executions.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::api_router())
        .merge(routes::ws_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Bind `0.0.0.0:port` and serve until the process exits.
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state).await
}

pub async fn serve_on(listener: TcpListener, state: AppState) -> Result<()> {
    info!(addr = %listener.local_addr()?, "API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
