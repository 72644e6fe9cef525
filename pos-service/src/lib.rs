pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use startup::{AppState, Application};

/// Every route of the service. Only login and the operational probes are
/// reachable without a bearer token.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/bill-items",
            get(handlers::bills::list_bills)
                .post(handlers::bills::create_bill)
                .delete(handlers::bills::clear_bills),
        )
        .route(
            "/bill-items/:id",
            get(handlers::bills::get_bill).delete(handlers::bills::delete_bill),
        )
        .route("/bill-items/:id/receipt", get(handlers::bills::bill_receipt))
        .route("/last-bill", get(handlers::bills::last_bill))
        .route("/deleted-bills", get(handlers::bills::list_deleted_bills))
        .route(
            "/menu-items",
            get(handlers::menu::list_available).post(handlers::menu::create_item),
        )
        .route("/menu-items/all", get(handlers::menu::list_all))
        .route("/menu-items/deleted", get(handlers::menu::list_deleted))
        .route(
            "/menu-items/barcode/:barcode",
            get(handlers::menu::find_by_barcode),
        )
        .route(
            "/menu-items/:id",
            patch(handlers::menu::update_item).delete(handlers::menu::delete_item),
        )
        .route(
            "/menu-items/:id/toggle-availability",
            patch(handlers::menu::toggle_availability),
        )
        .route("/menu-items/:id/restore", patch(handlers::menu::restore_item))
        .route("/export/excel", post(handlers::export::export_records))
        .route("/export/daySummary", post(handlers::export::export_day_summary))
        .route("/export/billSales", post(handlers::export::export_bill_sales))
        .route(
            "/export/deletedItems",
            post(handlers::export::export_deleted_items),
        )
        .route(
            "/export/deletedBills",
            post(handlers::export::export_deleted_bills),
        )
        .route("/export/storageInfo", get(handlers::export::storage_info))
        .route(
            "/user-details",
            get(handlers::shop::get_user_details).put(handlers::shop::update_user_details),
        )
        .route(
            "/customers",
            get(handlers::shop::list_customers).post(handlers::shop::create_customer),
        )
        .route(
            "/customers/phone/:phone",
            get(handlers::shop::find_customer_by_phone),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/auth/login", post(handlers::auth::login))
        .merge(protected)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(
            // The desktop shell loads the UI from its own origin.
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
        )
}
