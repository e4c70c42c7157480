//! Waste identification and circuit board analysis

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use ww_common::image::DataUri;
use ww_common::waste_info::{waste_info, WasteInfo};

use crate::classify::{CircuitAnalysis, Classifier};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    #[serde(default)]
    pub photo_data_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteResponse {
    pub waste_type: String,
    pub confidence: f64,
    pub info: WasteInfo,
}

fn classifier(state: &AppState) -> ApiResult<Arc<dyn Classifier>> {
    state
        .classifier
        .clone()
        .ok_or_else(|| ApiError::Unavailable("image classification is not configured".to_string()))
}

/// POST /api/classify/waste
pub async fn identify_waste(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> ApiResult<Json<WasteResponse>> {
    let classifier = classifier(&state)?;
    let photo: DataUri = body.photo_data_uri.parse()?;

    debug!(classifier = classifier.name(), "Identifying waste type");
    let result = classifier.identify_waste(&photo).await.map_err(|e| {
        warn!(classifier = classifier.name(), error = %e, "Waste identification failed");
        e
    })?;

    let info = waste_info(Some(&result.waste_type));
    Ok(Json(WasteResponse {
        waste_type: result.waste_type,
        confidence: result.confidence,
        info,
    }))
}

/// POST /api/classify/circuit
pub async fn analyze_circuit(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> ApiResult<Json<CircuitAnalysis>> {
    let classifier = classifier(&state)?;
    let photo: DataUri = body.photo_data_uri.parse()?;

    debug!(classifier = classifier.name(), "Analyzing circuit board");
    let analysis = classifier.analyze_circuit_board(&photo).await.map_err(|e| {
        warn!(classifier = classifier.name(), error = %e, "Circuit analysis failed");
        e
    })?;
    Ok(Json(analysis))
}

pub fn classify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/classify/waste", post(identify_waste))
        .route("/api/classify/circuit", post(analyze_circuit))
}
