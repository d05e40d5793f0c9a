pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod ledger;
pub mod models;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::ReservationService;
use crate::store::OrderStore;

// Общее состояние приложения
pub struct AppState<S> {
    pub reservations: ReservationService<S>,
    pub cache: Option<cache::CacheService>,
}

impl<S: OrderStore> AppState<S> {
    pub fn new(
        reservations: ReservationService<S>,
        cache: Option<cache::CacheService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            reservations,
            cache,
        })
    }
}

pub fn app<S: OrderStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/", get(|| async { "City Events reservations v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes::<S>())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
