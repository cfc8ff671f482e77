// ============================================================================
// HTTP Layer - actix-web routes for /pedidos and /health
// ============================================================================
//
// Handlers translate between JSON and the order workflow. Every request runs
// inside a span carrying a generated `request_id`, echoed back in the
// `x-request-id` response header.
//
// ============================================================================

mod errors;
mod handlers;

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::domain::order::{OrderCommandHandler, OrderQueries};
use crate::metrics::Metrics;
use crate::store::OrderStore;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared, stateless services built once at startup.
pub struct AppState {
    pub commands: OrderCommandHandler,
    pub queries: OrderQueries,
    pub store: Arc<dyn OrderStore>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(store: Arc<dyn OrderStore>, metrics: Arc<Metrics>) -> Self {
        Self {
            commands: OrderCommandHandler::new(store.clone()),
            queries: OrderQueries::new(store.clone()),
            store,
            metrics,
        }
    }
}

/// Registers the API routes and the JSON body error handler.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/pedidos")
                .route("", web::post().to(handlers::create_order))
                .route("", web::get().to(handlers::list_orders))
                .route("/{id}", web::get().to(handlers::get_order))
                .route("/{id}", web::patch().to(handlers::update_order))
                .route("/{id}", web::delete().to(handlers::delete_order)),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        tracing::warn!(error = %message, "Rejected request body");
        InternalError::from_response(err, HttpResponse::BadRequest().json(json!({ "error": message })))
            .into()
    })
}

/// Wraps each request in a `request` span with a fresh request id.
pub async fn request_span(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let request_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.path(),
    );

    async move {
        let mut res = next.call(req).await?;
        tracing::debug!(status = res.status().as_u16(), "Request completed");
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            res.headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        Ok::<_, actix_web::Error>(res)
    }
    .instrument(span)
    .await
}
