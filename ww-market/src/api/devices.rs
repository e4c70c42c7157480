//! Seller device submissions

use axum::{
    extract::{Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use ww_common::models::DeviceSubmission;

use super::{actor_id, respond, Actor, WriteMode};
use crate::services::DeviceInput;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDeviceRequest {
    pub photo_data_uri: Option<String>,
    #[serde(default)]
    pub device_details: String,
}

/// POST /api/devices
pub async fn submit_device(
    State(state): State<AppState>,
    actor: Option<Actor>,
    Query(mode): Query<WriteMode>,
    Json(body): Json<SubmitDeviceRequest>,
) -> ApiResult<Response> {
    let issued = state
        .market
        .submit_device(
            actor_id(&actor),
            DeviceInput {
                photo_data_uri: body.photo_data_uri,
                device_details: body.device_details,
            },
        )
        .await?;
    respond(issued, mode).await
}

/// GET /api/devices
pub async fn my_devices(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Json<Vec<DeviceSubmission>>> {
    Ok(Json(state.market.my_devices(&actor.user_id).await?))
}

pub fn device_routes() -> Router<AppState> {
    Router::new().route("/api/devices", get(my_devices).post(submit_device))
}
