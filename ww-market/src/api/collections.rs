//! Delivery partner collection workflow

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use ww_common::models::{CollectionStatus, DeliveryPartnerTransaction, DeviceSubmission};

use super::{actor_id, respond, Actor, WriteMode};
use crate::services::CollectionView;
use crate::{ApiResult, AppState};

/// Device to accept, addressed by its owner
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptCollectionRequest {
    pub user_id: String,
    pub device_id: String,
}

/// `?status=accepted|collected`
#[derive(Debug, Default, Deserialize)]
pub struct MineQuery {
    pub status: Option<CollectionStatus>,
}

/// GET /api/collections/available
pub async fn available(
    State(state): State<AppState>,
    _actor: Actor,
) -> ApiResult<Json<Vec<DeviceSubmission>>> {
    Ok(Json(state.market.available_collections().await?))
}

/// GET /api/collections/mine
pub async fn mine(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<MineQuery>,
) -> ApiResult<Json<Vec<CollectionView>>> {
    Ok(Json(
        state
            .market
            .my_collections(&actor.user_id, query.status)
            .await?,
    ))
}

/// POST /api/collections
pub async fn accept(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Query(mode): Query<WriteMode>,
    Json(body): Json<AcceptCollectionRequest>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .accept_collection(actor_id(&actor), &body.user_id, &body.device_id)
        .await?;
    respond(issued, mode).await
}

/// POST /api/collections/:id/collected
pub async fn collected(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(request_id): Path<String>,
    Query(mode): Query<WriteMode>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .mark_collected(actor_id(&actor), &request_id)
        .await?;
    respond(issued, mode).await
}

/// GET /api/transactions
pub async fn transactions(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<DeliveryPartnerTransaction>>> {
    Ok(Json(state.market.my_transactions(&actor.user_id).await?))
}

pub fn collection_routes() -> Router<AppState> {
    Router::new()
        .route("/api/collections", post(accept))
        .route("/api/collections/available", get(available))
        .route("/api/collections/mine", get(mine))
        .route("/api/collections/:id/collected", post(collected))
        .route("/api/transactions", get(transactions))
}
