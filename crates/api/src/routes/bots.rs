use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use common::Decision;
use engine::{report, BotHandle, PositionState};

use crate::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/bots", get(list_bots))
        .route("/api/bots/:id", get(get_bot))
        .route("/api/strategies", get(list_strategies))
        .route("/api/performance", get(get_performance))
}

/// One row of the bot listing; the candle window is left out.
#[derive(Serialize)]
struct BotSummary {
    id: Uuid,
    symbol: String,
    interval: String,
    strategy: String,
    active: bool,
    stopped: bool,
    position: PositionState,
    last_decision: Decision,
    total_candles: u64,
}

impl From<&BotHandle> for BotSummary {
    fn from(handle: &BotHandle) -> Self {
        let state = handle.state();
        Self {
            id: handle.config.id,
            symbol: state.symbol,
            interval: state.interval,
            strategy: state.strategy,
            active: handle.config.active,
            stopped: handle.is_stopped(),
            position: state.position,
            last_decision: state.last_decision,
            total_candles: state.total_candles,
        }
    }
}

// ─── Bots ─────────────────────────────────────────────────────────────────────

async fn list_bots(State(state): State<AppState>) -> Json<Vec<BotSummary>> {
    let mut bots: Vec<BotSummary> = state.registry.list().await.iter().map(BotSummary::from).collect();
    bots.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.id.cmp(&b.id)));
    Json(bots)
}

async fn get_bot(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.registry.get(id).await {
        Some(handle) => Json(handle.state()).into_response(),
        None => not_found(id),
    }
}

fn not_found(id: Uuid) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": format!("bot {id} not found") }))).into_response()
}

// ─── Strategies ───────────────────────────────────────────────────────────────

async fn list_strategies() -> Json<Vec<&'static str>> {
    Json(strategy::available().collect())
}

// ─── Performance ──────────────────────────────────────────────────────────────

async fn get_performance(State(state): State<AppState>) -> Response {
    match report::performance(state.executions.as_ref()).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            error!(error = %e, "failed to load execution logs");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "execution history unavailable" })),
            )
                .into_response()
        }
    }
}
