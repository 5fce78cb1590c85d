//! API Router configuration

use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    let tenant_routes = Router::new()
        // Annual matrix
        .route("/matrix/:year", get(handlers::get_year_matrix))
        .route("/matrix/:year/totals", get(handlers::get_matrix_totals))
        .route("/matrix/:year/batch", post(handlers::batch_upsert))
        .route("/matrix/:year/cells", put(handlers::upsert_cell))
        // Daily entries
        .route("/entries", post(handlers::record_entry))
        .route("/entries/daily/:date", get(handlers::get_daily_totals))
        // Monthly lifecycle
        .route("/months/:year/:month", get(handlers::get_monthly_summary))
        .route(
            "/months/:year/:month/entries",
            get(handlers::list_monthly_entries),
        )
        .route("/months/:year/:month/close", post(handlers::close_month))
        .route(
            "/months/:year/:month/transfer",
            post(handlers::transfer_month),
        )
        // Official records
        .route("/official/:year", get(handlers::list_official_records))
        .route("/official/:year/:month", get(handlers::get_official_record))
        .route(
            "/official/:year/:month/verify",
            get(handlers::verify_official_record),
        );

    let api_routes = Router::new()
        .route("/taxonomy", get(handlers::get_taxonomy))
        .nest("/tenants/:tenant", tenant_routes);

    // Build router with middleware
    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
