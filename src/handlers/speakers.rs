use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
};
use chrono::Utc;

use crate::{
    error::Result,
    helpers::{json_payload, respond_created, respond_success},
    models::dto::{DeletedResponse, SpeakerRequest},
    services::speakers as speaker_service,
    state::AppState,
    validation::request::validate_request,
};

/// Creates a new speaker.
#[axum::debug_handler]
pub async fn create_speaker(
    State(state): State<AppState>,
    body: std::result::Result<Json<SpeakerRequest>, JsonRejection>,
) -> Result<Response> {
    let req = json_payload(body)?;
    validate_request(&req)?;

    let speaker = speaker_service::create_speaker(&state, req.into_speaker(Utc::now())).await?;
    Ok(respond_created(speaker, "Speaker created successfully"))
}

/// Lists every speaker.
#[axum::debug_handler]
pub async fn list_speakers(State(state): State<AppState>) -> Result<Response> {
    let speakers = speaker_service::list_speakers(&state).await?;
    Ok(respond_success(speakers, None))
}

/// Gets one speaker.
#[axum::debug_handler]
pub async fn get_speaker(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let speaker = speaker_service::get_speaker(&state, &id).await?;
    Ok(respond_success(speaker, None))
}

/// Replaces a speaker. The path id wins over any id in the body.
#[axum::debug_handler]
pub async fn update_speaker(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: std::result::Result<Json<SpeakerRequest>, JsonRejection>,
) -> Result<Response> {
    let mut req = json_payload(body)?;
    validate_request(&req)?;
    req.id = Some(id);

    let speaker = speaker_service::update_speaker(&state, req.into_speaker(Utc::now())).await?;
    Ok(respond_success(speaker, Some("Speaker updated successfully")))
}

/// Deletes a speaker.
#[axum::debug_handler]
pub async fn delete_speaker(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let deleted_id = speaker_service::delete_speaker(&state, &id).await?;
    Ok(respond_success(
        DeletedResponse { deleted_id },
        Some("Speaker deleted successfully"),
    ))
}
