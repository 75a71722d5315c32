use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    document::{Document, null_as_default},
    session::Session,
};

/// Represents a conference speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Speaker {
    /// The unique identifier, also the partition key.
    pub id: String,
    /// The speaker's full name.
    pub name: String,
    /// The speaker's contact email.
    pub email: String,
    /// The speaker's job title.
    #[serde(default)]
    pub position: String,
    /// The speaker's employer.
    #[serde(default)]
    pub company: String,
    /// A short biography.
    #[serde(default)]
    pub bio: String,
    /// Link to a profile photo.
    #[serde(default)]
    pub photo_url: String,
    /// Denormalized copy of the speaker's sessions. Not authoritative.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions: Vec<Session>,
    /// The timestamp when the speaker was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the speaker was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Document for Speaker {
    const KIND: &'static str = "speaker";

    fn id(&self) -> &str {
        &self.id
    }
}
