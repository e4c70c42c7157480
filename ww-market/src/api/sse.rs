//! Live marketplace feed

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /events
///
/// Every `MarketEvent`, including `WriteFailed` for optimistic writes the
/// store rejected.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    ww_common::sse::market_event_stream(&state.event_bus, crate::config::MODULE_NAME)
}
