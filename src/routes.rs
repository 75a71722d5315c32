use axum::{Router, middleware::from_fn_with_state, routing::get};
use http::{Method, header};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    handlers,
    middleware_layer::{auth::require_auth, guard::require_scope},
    state::AppState,
};

/// Builds the application router.
///
/// `/api/v1/health` is public. Every session and speaker route needs a valid
/// bearer token carrying the configured scope.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// The `Router`, ready to serve.
pub fn build_router(state: AppState) -> Router {
    let required_scope = state.config.auth.required_scope.clone();

    let public_routes = Router::new().route("/api/v1/health", get(handlers::health::check));

    let session_routes = Router::new()
        .route(
            "/api/v1/sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::create_session),
        )
        .route(
            "/api/v1/sessions/{id}",
            get(handlers::sessions::get_session)
                .put(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        )
        .route_layer(require_scope(required_scope.clone()))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let speaker_routes = Router::new()
        .route(
            "/api/v1/speakers",
            get(handlers::speakers::list_speakers).post(handlers::speakers::create_speaker),
        )
        .route(
            "/api/v1/speakers/{id}",
            get(handlers::speakers::get_speaker)
                .put(handlers::speakers::update_speaker)
                .delete(handlers::speakers::delete_speaker),
        )
        .route_layer(require_scope(required_scope))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(speaker_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false))
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors)
}
