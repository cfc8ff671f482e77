use std::time::Instant;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::domain::order::{CreateOrder, ErrorKind, OrderError, OrderFilter, OrderPatch};
use super::errors::{parse_id, ApiError};
use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    estado: Option<String>,
}

/// Records duration and failure metrics for one workflow call and logs
/// failures at a level matching their kind.
fn track<T>(
    state: &AppState,
    operation: &'static str,
    started: Instant,
    result: Result<T, OrderError>,
) -> Result<T, ApiError> {
    state
        .metrics
        .observe_duration(operation, started.elapsed().as_secs_f64());

    result.map_err(|err| {
        let kind = err.kind();
        state.metrics.record_failure(operation, kind.as_str());
        match kind {
            ErrorKind::Unexpected => {
                tracing::error!(operation, error = %err, "Order operation failed")
            }
            _ => tracing::warn!(operation, kind = kind.as_str(), error = %err, "Order request rejected"),
        }
        ApiError::Order(err)
    })
}

pub async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrder>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = track(&state, "create", started, state.commands.create(body.into_inner()).await)?;
    state.metrics.record_created();
    Ok(HttpResponse::Created().json(result))
}

pub async fn list_orders(
    state: web::Data<AppState>,
    params: web::Query<ListParams>,
) -> Result<HttpResponse, ApiError> {
    let started = Instant::now();
    let result = match OrderFilter::from_query(params.estado.as_deref()) {
        Ok(filter) => state.queries.list(&filter).await,
        Err(err) => Err(err),
    };
    let orders = track(&state, "list", started, result)?;
    Ok(HttpResponse::Ok().json(orders))
}

pub async fn get_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_id(&path)?;
    let started = Instant::now();
    let view = track(&state, "get", started, state.queries.get_by_id(order_id).await)?;
    match view {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Err(ApiError::Order(OrderError::OrderNotFound(order_id))),
    }
}

pub async fn update_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<OrderPatch>,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_id(&path)?;
    let started = Instant::now();
    let result = track(
        &state,
        "update",
        started,
        state.commands.update(order_id, body.into_inner()).await,
    )?;
    state.metrics.record_update(result.branch.as_str());
    Ok(HttpResponse::Ok().json(result))
}

pub async fn delete_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order_id = parse_id(&path)?;
    let started = Instant::now();
    track(&state, "delete", started, state.commands.delete(order_id).await)?;
    state.metrics.record_deleted();
    Ok(HttpResponse::NoContent().finish())
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(json!({ "status": "OK", "database": "Connected" })),
        Err(err) => {
            tracing::error!(error = %err, "Health check failed");
            HttpResponse::InternalServerError()
                .json(json!({ "status": "ERROR", "database": err.to_string() }))
        }
    }
}
