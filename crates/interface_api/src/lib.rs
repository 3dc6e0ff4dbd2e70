//! HTTP API Layer
//!
//! REST API for the bill lifecycle using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for bills, stock and health
//! - **Middleware**: Request ids, tracing, audit logging
//! - **DTOs**: camelCase request/response bodies
//! - **Error Handling**: Consistent `{error, message, details}` responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(billing, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_billing::BillingService;

use crate::config::ApiConfig;
use crate::handlers::{bills, health, stock};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub billing: Arc<dyn BillingService>,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `billing` - The bill lifecycle service
/// * `config` - API configuration
pub fn create_router(billing: Arc<dyn BillingService>, config: ApiConfig) -> Router {
    let state = AppState { billing, config };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let bill_routes = Router::new()
        .route("/", get(bills::list_bills).post(bills::create_bill))
        .route("/:id", get(bills::get_bill).delete(bills::delete_bill));

    let stock_routes = Router::new().route("/low", get(stock::low_stock));

    let api_routes = Router::new()
        .nest("/bills", bill_routes)
        .nest("/stock", stock_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
