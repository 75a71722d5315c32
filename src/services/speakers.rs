use chrono::Utc;
use uuid::Uuid;

use crate::{error::Result, models::speaker::Speaker, state::AppState};

/// Creates a new speaker.
///
/// A caller supplied id is kept; an empty one is generated.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `speaker` - The speaker to create.
///
/// # Returns
///
/// A `Result` containing the created `Speaker`, or the store's write error.
pub async fn create_speaker(state: &AppState, mut speaker: Speaker) -> Result<Speaker> {
    if speaker.id.is_empty() {
        speaker.id = Uuid::new_v4().to_string();
    }

    let now = Utc::now();
    speaker.created_at = now;
    speaker.updated_at = now;

    let speaker = state.speakers.create(speaker).await?;
    tracing::info!("✅ Speaker created: {}", speaker.id);
    Ok(speaker)
}

/// Lists every speaker.
pub async fn list_speakers(state: &AppState) -> Result<Vec<Speaker>> {
    state.speakers.get_all().await
}

/// Gets one speaker.
pub async fn get_speaker(state: &AppState, id: &str) -> Result<Speaker> {
    state.speakers.get_by_id(id).await
}

/// Replaces a speaker.
pub async fn update_speaker(state: &AppState, speaker: Speaker) -> Result<Speaker> {
    state.speakers.update(speaker).await
}

/// Deletes a speaker.
///
/// # Returns
///
/// A `Result` containing the deleted id.
pub async fn delete_speaker(state: &AppState, id: &str) -> Result<String> {
    let id = state.speakers.delete(id).await?;
    tracing::info!("🗑️ Speaker deleted: {}", id);
    Ok(id)
}
