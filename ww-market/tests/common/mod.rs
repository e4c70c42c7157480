//! Shared helpers for ww-market integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use ww_common::events::EventBus;
use ww_common::image::DataUri;
use ww_common::payment::Payee;
use ww_common::status::FeeSchedule;
use ww_market::classify::{
    BoundingBox, CircuitAnalysis, CircuitComponent, ClassifyError, Classifier,
    WasteIdentification,
};
use ww_market::{build_router, AppState};

/// Smallest payload `DataUri` accepts as a PNG
pub const PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

pub fn payee() -> Payee {
    Payee {
        id: "wastewise@upi".to_string(),
        name: "WasteWise".to_string(),
        currency: "INR".to_string(),
    }
}

/// App state over an in-memory database
pub async fn test_app_state() -> AppState {
    let db_pool = ww_market::db::init_memory_pool().await.unwrap();
    AppState::new(db_pool, EventBus::new(100), FeeSchedule::default(), payee())
}

pub async fn test_app() -> Router {
    build_router(test_app_state().await)
}

/// Router over a WAL database file; keep the `TempDir` alive with it
pub async fn file_test_app() -> (Router, tempfile::TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let db_pool = ww_market::db::init_database_pool(&temp.path().join("wastewise.db"))
        .await
        .unwrap();
    let state = AppState::new(db_pool, EventBus::new(100), FeeSchedule::default(), payee());
    (build_router(state), temp)
}

/// Send a request and decode the JSON body (`Null` when empty)
pub async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Register an account; returns (token, user id)
pub async fn sign_up(app: &Router, email: &str) -> (String, String) {
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({ "email": email, "password": "hunter22" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);
    (
        body["token"].as_str().unwrap().to_string(),
        body["userId"].as_str().unwrap().to_string(),
    )
}

/// Scripted classifier returning fixed results
pub struct StubClassifier {
    pub waste: Result<WasteIdentification, String>,
}

impl StubClassifier {
    pub fn identifying(waste_type: &str, confidence: f64) -> Self {
        Self {
            waste: Ok(WasteIdentification {
                waste_type: waste_type.to_string(),
                confidence,
            }),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            waste: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn identify_waste(&self, _photo: &DataUri) -> Result<WasteIdentification, ClassifyError> {
        self.waste.clone().map_err(ClassifyError::Network)
    }

    async fn analyze_circuit_board(
        &self,
        _photo: &DataUri,
    ) -> Result<CircuitAnalysis, ClassifyError> {
        Ok(CircuitAnalysis {
            components: vec![CircuitComponent {
                component_name: "Capacitor".to_string(),
                description: "Stores and releases electrical charge.".to_string(),
                bounding_box: BoundingBox {
                    x: 10.0,
                    y: 20.0,
                    width: 5.0,
                    height: 2.0,
                },
            }],
        })
    }
}

pub async fn app_with_classifier(classifier: StubClassifier) -> Router {
    let state = test_app_state().await.with_classifier(Arc::new(classifier));
    build_router(state)
}
