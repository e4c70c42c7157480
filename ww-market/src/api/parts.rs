//! Recycled parts marketplace

use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use ww_common::models::{PartSale, RecycledPart};

use super::{actor_id, respond, Actor, WriteMode};
use crate::services::PartInput;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPartRequest {
    pub photo_data_uri: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub details: String,
    pub price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseQuery {
    pub q: Option<String>,
}

/// UPI payment request for one part
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestResponse {
    pub part_id: String,
    pub uri: String,
    pub amount: f64,
    pub currency: String,
    pub payee_id: String,
    pub payee_name: String,
}

/// POST /api/parts
pub async fn list_part(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Query(mode): Query<WriteMode>,
    Json(body): Json<ListPartRequest>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .list_part(
            actor_id(&actor),
            PartInput {
                photo_data_uri: body.photo_data_uri,
                name: body.name,
                details: body.details,
                price: body.price,
            },
        )
        .await?;
    respond(issued, mode).await
}

/// GET /api/parts?q=
pub async fn browse(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> ApiResult<Json<Vec<RecycledPart>>> {
    Ok(Json(state.market.browse_parts(query.q.as_deref()).await?))
}

/// GET /api/parts/:id/payment-request
pub async fn payment_request(
    State(state): State<AppState>,
    _actor: Actor,
    Path(part_id): Path<String>,
) -> ApiResult<Json<PaymentRequestResponse>> {
    let request = state.market.payment_request(&part_id).await?;
    Ok(Json(PaymentRequestResponse {
        part_id,
        uri: request.to_uri()?,
        amount: request.amount,
        currency: request.payee.currency,
        payee_id: request.payee.id,
        payee_name: request.payee.name,
    }))
}

/// POST /api/parts/:id/purchase
pub async fn purchase(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Path(part_id): Path<String>,
    Query(mode): Query<WriteMode>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .purchase_part(actor_id(&actor), &part_id)
        .await?;
    respond(issued, mode).await
}

/// GET /api/purchases
pub async fn my_purchases(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<PartSale>>> {
    Ok(Json(state.market.my_purchases(&actor.user_id).await?))
}

pub fn part_routes() -> Router<AppState> {
    Router::new()
        .route("/api/parts", get(browse).post(list_part))
        .route("/api/parts/:id/payment-request", get(payment_request))
        .route("/api/parts/:id/purchase", post(purchase))
        .route("/api/purchases", get(my_purchases))
}
