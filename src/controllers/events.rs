use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ReservationError;
use crate::models::EventId;
use crate::store::OrderStore;
use crate::AppState;

pub fn routes<S: OrderStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/events/search", get(search_events::<S>))
        .route("/events/{id}/availability", get(get_availability::<S>))
        .route("/events/{id}/available-tickets", get(available_tickets::<S>))
        .route("/events/{id}/details", get(event_details::<S>))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub term: String,
}

// GET /api/events/search?term=
pub async fn search_events<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ReservationError> {
    let term = params.term.trim();

    if let Some(cache) = &state.cache {
        match cache.get_cached_search(term).await {
            Ok(Some(events)) => return Ok(Json(events)),
            Ok(None) => {}
            Err(e) => tracing::warn!("search cache read failed: {:?}", e),
        }
    }

    let events = state.reservations.search_events(term).await?;

    if let Some(cache) = &state.cache {
        if !term.is_empty() {
            if let Err(e) = cache.cache_search_result(term, &events).await {
                tracing::warn!("Failed to cache search result: {:?}", e);
            }
        }
    }

    Ok(Json(events))
}

// GET /api/events/{id}/availability
async fn get_availability<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ReservationError> {
    let availability = state.reservations.get_availability(id, None).await?;
    Ok(Json(availability))
}

// GET /api/events/{id}/available-tickets
async fn available_tickets<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ReservationError> {
    let available = state.reservations.query_available_tickets(id).await?;
    Ok(Json(available))
}

// GET /api/events/{id}/details - для неизвестного события 0 билетов
async fn event_details<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ReservationError> {
    let details = state.reservations.event_details(id).await?;
    Ok(Json(details))
}
