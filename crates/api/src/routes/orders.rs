//! Order CRUD and lifecycle endpoints.
//!
//! Request bodies are taken as untyped JSON and handed to the domain
//! validators, so malformed fields come back as a list of violations rather
//! than a single deserializer error.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::{Order, OrderId, OrderService, OrderStatus};
use order_store::OrderStore;
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{Admin, Caller};
use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub order_service: OrderService<S>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// GET /orders: every order, oldest first, optionally filtered by `?status=`.
#[tracing::instrument(skip(state, _caller))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(state.order_service.list(status).await?))
}

/// POST /orders
#[tracing::instrument(skip(state, caller, payload), fields(role = caller.role.as_str()))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let candidate = body(payload)?;
    let order = state.order_service.create(&candidate).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /orders/import: stores an order under the id it already carries.
#[tracing::instrument(skip(state, _admin, payload))]
pub async fn import<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Admin,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let candidate = body(payload)?;
    let order = state.order_service.import(&candidate).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders/{id}
#[tracing::instrument(skip(state, _caller))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .order_service
        .find(&OrderId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    Ok(Json(order))
}

/// PATCH or PUT /orders/{id}: merges the supplied fields into the order.
///
/// A `status` field is applied through the lifecycle rules.
#[tracing::instrument(skip(state, _caller, payload))]
pub async fn update<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let changes = body(payload)?;
    let order = state
        .order_service
        .update(&OrderId::new(id), &changes)
        .await?;
    Ok(Json(order))
}

/// DELETE /orders/{id}: admin only.
#[tracing::instrument(skip(state, _admin))]
pub async fn delete<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _admin: Admin,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.order_service.delete(&OrderId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /orders/{id}/accept
#[tracing::instrument(skip(state, _caller))]
pub async fn accept<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.accept(&OrderId::new(id)).await?))
}

/// POST /orders/{id}/reject
#[tracing::instrument(skip(state, _caller))]
pub async fn reject<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.reject(&OrderId::new(id)).await?))
}

/// POST /orders/{id}/ready
#[tracing::instrument(skip(state, _caller))]
pub async fn ready<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.mark_ready(&OrderId::new(id)).await?))
}

/// POST /orders/{id}/complete
#[tracing::instrument(skip(state, _caller))]
pub async fn complete<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.complete(&OrderId::new(id)).await?))
}

/// POST /orders/{id}/pay
#[tracing::instrument(skip(state, _caller))]
pub async fn pay<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state.order_service.record_payment(&OrderId::new(id)).await?,
    ))
}
