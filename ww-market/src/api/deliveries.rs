//! Part sale deliveries

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use ww_common::models::PartSale;

use super::{actor_id, respond, Actor, WriteMode};
use crate::{ApiResult, AppState};

/// GET /api/deliveries/available
pub async fn available(
    State(state): State<AppState>,
    _actor: Actor,
) -> ApiResult<Json<Vec<PartSale>>> {
    Ok(Json(state.market.available_deliveries().await?))
}

/// GET /api/deliveries/mine
pub async fn mine(State(state): State<AppState>, actor: Actor) -> ApiResult<Json<Vec<PartSale>>> {
    Ok(Json(state.market.my_deliveries(&actor.user_id).await?))
}

/// POST /api/deliveries/:id/accept
pub async fn accept(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(sale_id): Path<String>,
    Query(mode): Query<WriteMode>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .accept_delivery(actor_id(&actor), &sale_id)
        .await?;
    respond(issued, mode).await
}

/// POST /api/deliveries/:id/delivered
pub async fn delivered(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(sale_id): Path<String>,
    Query(mode): Query<WriteMode>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .mark_delivered(actor_id(&actor), &sale_id)
        .await?;
    respond(issued, mode).await
}

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/api/deliveries/available", get(available))
        .route("/api/deliveries/mine", get(mine))
        .route("/api/deliveries/:id/accept", post(accept))
        .route("/api/deliveries/:id/delivered", post(delivered))
}
