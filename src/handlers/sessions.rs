use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
};
use chrono::Utc;

use crate::{
    error::Result,
    helpers::{json_payload, respond_created, respond_success},
    models::dto::{DeletedResponse, SessionRequest},
    services::sessions as session_service,
    state::AppState,
    validation::request::validate_request,
};

/// Creates a new session.
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    body: std::result::Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Response> {
    let req = json_payload(body)?;
    validate_request(&req)?;

    let session = session_service::create_session(&state, req.into_session(Utc::now())).await?;
    Ok(respond_created(session, "Session created successfully"))
}

/// Lists every session.
#[axum::debug_handler]
pub async fn list_sessions(State(state): State<AppState>) -> Result<Response> {
    let sessions = session_service::list_sessions(&state).await?;
    Ok(respond_success(sessions, None))
}

/// Gets one session.
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let session = session_service::get_session(&state, &id).await?;
    Ok(respond_success(session, None))
}

/// Replaces a session. The path id wins over any id in the body.
#[axum::debug_handler]
pub async fn update_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Response> {
    let mut req = json_payload(body)?;
    validate_request(&req)?;
    req.id = Some(id);

    let session = session_service::update_session(&state, req.into_session(Utc::now())).await?;
    Ok(respond_success(session, Some("Session updated successfully")))
}

/// Deletes a session.
#[axum::debug_handler]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let deleted_id = session_service::delete_session(&state, &id).await?;
    Ok(respond_success(
        DeletedResponse { deleted_id },
        Some("Session deleted successfully"),
    ))
}
