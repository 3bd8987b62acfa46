pub mod applications;
pub mod files;
pub mod health;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Builds the full application router, including the CORS, tracing and body
/// limit layers used in production.
pub fn build_router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.config.cors_allowed_origins)?;
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Ok(Router::new()
        .route("/", get(applications::handle_root))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::readiness_handler))
        .route("/posts", get(applications::handle_list))
        .route("/post", post(applications::handle_submit))
        .route(
            "/post/:id",
            get(applications::handle_get)
                .put(applications::handle_update_status)
                .delete(applications::handle_delete),
        )
        .route("/uploadfile/", post(files::handle_upload))
        .route("/downloadfile/:name", get(files::handle_download))
        .layer(body_limit)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}

/// Cross-origin access is limited to the configured origins; methods and
/// headers mirror whatever the allowed origin asks for.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            o.parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}
