use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ReservationError;
use crate::models::{OrderId, OrderQuery, OrderRequest};
use crate::store::OrderStore;
use crate::AppState;

pub fn routes<S: OrderStore>() -> Router<Arc<AppState<S>>> {
    Router::new()
        .route("/orders", get(list_orders::<S>).post(create_order::<S>))
        .route(
            "/orders/{id}",
            get(get_order::<S>)
                .put(update_order::<S>)
                .delete(cancel_order::<S>),
        )
}

#[derive(Debug, Serialize)]
struct CreateOrderResponse {
    id: OrderId,
}

// POST /api/orders
async fn create_order<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<OrderRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    let id = state.reservations.create_order(&req).await?;
    Ok((StatusCode::CREATED, Json(CreateOrderResponse { id })))
}

// GET /api/orders
async fn list_orders<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<OrderQuery>,
) -> Result<impl IntoResponse, ReservationError> {
    let page = state.reservations.list_orders(&query).await?;
    Ok(Json(page))
}

// GET /api/orders/{id}
async fn get_order<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse, ReservationError> {
    let order = state.reservations.get_order(id).await?;
    Ok(Json(order))
}

// PUT /api/orders/{id}
async fn update_order<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(req): Json<OrderRequest>,
) -> Result<impl IntoResponse, ReservationError> {
    state.reservations.update_order(id, &req).await?;
    Ok(StatusCode::NO_CONTENT)
}

// DELETE /api/orders/{id} - отсутствующий заказ не ошибка
async fn cancel_order<S: OrderStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
) -> Result<impl IntoResponse, ReservationError> {
    state.reservations.cancel_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
