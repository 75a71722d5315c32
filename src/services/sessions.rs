use chrono::Utc;
use uuid::Uuid;

use crate::{error::Result, models::session::Session, state::AppState};

/// Creates a new session.
///
/// Any id supplied by the caller is replaced with a fresh one.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `session` - The session to create.
///
/// # Returns
///
/// A `Result` containing the created `Session`.
pub async fn create_session(state: &AppState, mut session: Session) -> Result<Session> {
    if !session.id.is_empty() {
        tracing::debug!("Discarding caller supplied session id {}", session.id);
    }
    session.id = Uuid::new_v4().to_string();

    let now = Utc::now();
    session.created_at = now;
    session.updated_at = now;

    let session = state.sessions.create(session).await?;
    tracing::info!("✅ Session created: {}", session.id);
    Ok(session)
}

/// Lists every session.
pub async fn list_sessions(state: &AppState) -> Result<Vec<Session>> {
    state.sessions.get_all().await
}

/// Gets one session.
pub async fn get_session(state: &AppState, id: &str) -> Result<Session> {
    state.sessions.get_by_id(id).await
}

/// Replaces a session.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `session` - The full replacement, including its id.
///
/// # Returns
///
/// A `Result` containing the stored `Session`.
pub async fn update_session(state: &AppState, session: Session) -> Result<Session> {
    state.sessions.update(session).await
}

/// Deletes a session.
///
/// # Returns
///
/// A `Result` containing the deleted id.
pub async fn delete_session(state: &AppState, id: &str) -> Result<String> {
    let id = state.sessions.delete(id).await?;
    tracing::info!("🗑️ Session deleted: {}", id);
    Ok(id)
}
