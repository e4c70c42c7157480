//! Sign-up, sign-in and the bearer-token `Actor` extractor

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::services::Session;
use crate::{ApiError, ApiResult, AppState};

/// Signed-in user resolved from `Authorization: Bearer <token>`
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub user_id: String,
    pub token: String,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        let user_id = state
            .accounts
            .resolve_session(token)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("unknown or expired session".to_string()))?;
        Ok(Actor {
            user_id,
            token: token.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// POST /api/auth/signup
pub async fn sign_up(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let session = state
        .accounts
        .sign_up(&credentials.email, &credentials.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /api/auth/signin
pub async fn sign_in(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<Session>> {
    let session = state
        .accounts
        .sign_in(&credentials.email, &credentials.password)
        .await?;
    Ok(Json(session))
}

/// POST /api/auth/signout
pub async fn sign_out(State(state): State<AppState>, actor: Actor) -> ApiResult<StatusCode> {
    state.accounts.sign_out(&actor.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(sign_up))
        .route("/api/auth/signin", post(sign_in))
        .route("/api/auth/signout", post(sign_out))
}
