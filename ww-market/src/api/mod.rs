//! HTTP API handlers for ww-market
//!
//! Mutations answer `202 Accepted` with the assumed-successful entity as
//! soon as the writes are issued. `?wait=true` holds the response until
//! every write lands and answers `200`, or `502` on the first failure.

pub mod auth;
pub mod buildinfo;
pub mod classify;
pub mod collections;
pub mod deliveries;
pub mod devices;
pub mod health;
pub mod parts;
pub mod sse;

pub use auth::{auth_routes, Actor};
pub use buildinfo::buildinfo_routes;
pub use classify::classify_routes;
pub use collections::collection_routes;
pub use deliveries::delivery_routes;
pub use devices::device_routes;
pub use health::health_routes;
pub use parts::part_routes;
pub use sse::event_stream;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::Issued;
use crate::ApiResult;

/// `?wait=true` query flag
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WriteMode {
    #[serde(default)]
    pub wait: bool,
}

/// Render an issued action per the caller's write mode
pub(crate) async fn respond<T: Serialize>(issued: Issued<T>, mode: WriteMode) -> ApiResult<Response> {
    if mode.wait {
        let entity = issued.settle().await?;
        return Ok((StatusCode::OK, Json(entity)).into_response());
    }
    Ok((StatusCode::ACCEPTED, Json(issued.entity)).into_response())
}

/// Signed-in user id, if any, as the services expect it
pub(crate) fn actor_id(actor: &Option<Actor>) -> Option<&str> {
    actor.as_ref().map(|a| a.user_id.as_str())
}
