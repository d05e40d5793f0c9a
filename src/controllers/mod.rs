pub mod events;
pub mod orders;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use std::sync::Arc;

use crate::error::ReservationError;
use crate::store::OrderStore;
use crate::AppState;

pub fn routes<S: OrderStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .merge(events::routes())
        .merge(orders::routes())
}

impl IntoResponse for ReservationError {
    fn into_response(self) -> Response {
        let status = match &self {
            ReservationError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ReservationError::NotFound(_) => StatusCode::NOT_FOUND,
            ReservationError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ReservationError::Conflict(_) => StatusCode::CONFLICT,
            ReservationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Детали ошибки БД остаются в логах
        let message = match &self {
            ReservationError::Storage(_) => "internal storage error".to_string(),
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": message,
        }));
        (status, body).into_response()
    }
}
