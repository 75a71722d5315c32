use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use super::{
    document::null_as_default,
    session::{Level, Session, optional_level},
    speaker::Speaker,
};

/// The success envelope returned by every handler.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` without a message.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Wraps `data` with a human readable message.
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// The error envelope returned for every failure.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: u16,
    /// The caller's permissions, on permission failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<Vec<String>>,
    /// The caller's scope string, on permission failures only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// The request payload for creating or replacing a session.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Ignored on create, the service always assigns a fresh id.
    #[garde(skip)]
    #[serde(default)]
    pub id: Option<String>,
    #[garde(length(min = 1, max = 500))]
    pub title: String,
    #[garde(length(max = 500))]
    #[serde(default)]
    pub slug: String,
    #[garde(skip)]
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[garde(skip)]
    #[serde(default)]
    pub description: String,
    #[garde(skip)]
    #[serde(default)]
    pub room: String,
    #[garde(skip)]
    #[serde(default, deserialize_with = "optional_level")]
    pub level: Option<Level>,
    #[garde(skip)]
    #[serde(default)]
    pub format: String,
    #[garde(skip)]
    #[serde(default)]
    pub language: String,
    #[garde(skip)]
    #[serde(default, deserialize_with = "null_as_default")]
    pub speaker_ids: Vec<String>,
    /// Carried through on replace so the first creation time survives.
    #[garde(skip)]
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SessionRequest {
    /// Builds the domain entity. Timestamps default to `now`.
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            id: self.id.unwrap_or_default(),
            title: self.title,
            slug: self.slug,
            tags: self.tags.into_iter().collect(),
            description: self.description,
            room: self.room,
            level: self.level,
            format: self.format,
            language: self.language,
            speaker_ids: self.speaker_ids,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

/// The request payload for creating or replacing a speaker.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerRequest {
    /// Kept when present, generated by the service otherwise.
    #[garde(skip)]
    #[serde(default)]
    pub id: Option<String>,
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[garde(email)]
    pub email: String,
    #[garde(skip)]
    #[serde(default)]
    pub bio: String,
    #[garde(skip)]
    #[serde(default)]
    pub position: String,
    #[garde(skip)]
    #[serde(default)]
    pub company: String,
    #[garde(skip)]
    #[serde(default)]
    pub photo_url: String,
    #[garde(skip)]
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions: Vec<Session>,
    #[garde(skip)]
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl SpeakerRequest {
    /// Builds the domain entity. Timestamps default to `now`.
    pub fn into_speaker(self, now: DateTime<Utc>) -> Speaker {
        Speaker {
            id: self.id.unwrap_or_default(),
            name: self.name,
            email: self.email,
            position: self.position,
            company: self.company,
            bio: self.bio,
            photo_url: self.photo_url,
            sessions: self.sessions,
            created_at: self.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

/// The payload returned after a delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub deleted_id: String,
}
