//! ww-market library interface
//!
//! Exposes the router, services and store for integration testing.

pub mod api;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod store;
pub mod writes;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use ww_common::events::EventBus;
use ww_common::payment::Payee;
use ww_common::status::FeeSchedule;

use crate::classify::Classifier;
use crate::services::{Accounts, Marketplace};
use crate::store::{DocumentStore, SqliteDocumentStore};

/// Request bodies carry base64 photos up to 4 MiB decoded
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting and write failure reports
    pub event_bus: EventBus,
    pub market: Marketplace,
    pub accounts: Accounts,
    /// `None` when no API key is configured
    pub classifier: Option<Arc<dyn Classifier>>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State over the SQLite document store in `db`
    pub fn new(db: SqlitePool, event_bus: EventBus, fees: FeeSchedule, payee: Payee) -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(db.clone()));
        Self::with_store(db, store, event_bus, fees, payee)
    }

    /// State over any document store; accounts still live in `db`
    pub fn with_store(
        db: SqlitePool,
        store: Arc<dyn DocumentStore>,
        event_bus: EventBus,
        fees: FeeSchedule,
        payee: Payee,
    ) -> Self {
        Self {
            market: Marketplace::new(store, event_bus.clone(), fees, payee),
            accounts: Accounts::new(db.clone()),
            db,
            event_bus,
            classifier: None,
            startup_time: Utc::now(),
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::buildinfo_routes())
        .merge(api::auth_routes())
        .merge(api::device_routes())
        .merge(api::collection_routes())
        .merge(api::part_routes())
        .merge(api::delivery_routes())
        .merge(api::classify_routes())
        .route("/events", get(api::event_stream))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
