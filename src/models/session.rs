use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::document::{Document, null_as_default};

/// The audience level of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(format!(
                "unknown level '{other}', expected beginner, intermediate or advanced"
            )),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        };
        f.write_str(name)
    }
}

/// Reads a level that may be absent, `null` or an empty string.
pub(crate) fn optional_level<'de, D>(deserializer: D) -> Result<Option<Level>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Represents a conference session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The unique identifier, also the partition key.
    pub id: String,
    /// The session title.
    #[serde(default)]
    pub title: String,
    /// The URL slug.
    #[serde(default)]
    pub slug: String,
    /// Free-form tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
    /// The abstract.
    #[serde(default)]
    pub description: String,
    /// The room the session is held in.
    #[serde(default)]
    pub room: String,
    /// The audience level.
    #[serde(default, deserialize_with = "optional_level")]
    pub level: Option<Level>,
    /// Lecture, workshop, panel, keynote or presentation.
    #[serde(default)]
    pub format: String,
    /// The spoken language.
    #[serde(default)]
    pub language: String,
    /// Ids of the speakers presenting. Not checked against the speaker container.
    #[serde(default, deserialize_with = "null_as_default")]
    pub speaker_ids: Vec<String>,
    /// The timestamp when the session was created. Absent means the Unix epoch.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session was last updated. Absent means the Unix epoch.
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Document for Session {
    const KIND: &'static str = "session";

    fn id(&self) -> &str {
        &self.id
    }
}
