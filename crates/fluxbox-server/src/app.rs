use std::sync::Arc;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer`: structured request/response logging via `tracing`.
/// 2. `CorsLayer`: the configured origins, or any origin when none are set.
pub fn build_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/objects", get(routes::objects::list_objects))
        .route("/upload", get(routes::upload::request_upload))
        .route("/upload/complete", post(routes::upload::complete_upload))
        .route(
            "/upload/pending",
            get(routes::upload::get_pending).delete(routes::upload::cancel_pending),
        )
        .route(
            "/upload/pending/resolve",
            post(routes::upload::resolve_pending),
        )
        .route("/delete", delete(routes::delete::delete_object))
        .route("/download", get(routes::download::download))
        .route("/folder", post(routes::folder::create_folder))
        .route("/storage/usage", get(routes::usage::storage_usage))
        .route("/plans", get(routes::plans::list_plans))
        .route("/account", get(routes::account::get_account))
        .route("/payments/intents", post(routes::payments::create_intent))
        .route("/payments/confirm", post(routes::payments::confirm))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if parsed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(parsed))
    }
}
