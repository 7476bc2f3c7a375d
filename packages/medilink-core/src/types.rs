//! Wire types for the shared conversation log.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages offered by the settings panel.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "English",
    "Spanish",
    "French",
    "German",
    "Chinese",
    "Japanese",
    "Korean",
    "Hindi",
    "Arabic",
    "Portuguese",
    "Russian",
    "Italian",
];

/// Check whether a language name is in [`SUPPORTED_LANGUAGES`] (case-insensitive).
pub fn is_supported_language(language: &str) -> bool {
    SUPPORTED_LANGUAGES
        .iter()
        .any(|l| l.eq_ignore_ascii_case(language.trim()))
}

// ============================================================================
// Role
// ============================================================================

/// Conversational perspective. Not an identity: any client may speak as either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Doctor,
    Patient,
}

impl Role {
    pub fn other(&self) -> Role {
        match self {
            Role::Doctor => Role::Patient,
            Role::Patient => Role::Doctor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Patient => "patient",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Doctor => "Doctor",
            Role::Patient => "Patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "patient" => Ok(Role::Patient),
            other => Err(format!("unknown role '{}' (expected doctor or patient)", other)),
        }
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// A message in the shared log. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub role: Role,
    pub content: String,
    /// Filled in by the store once translation finishes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_content: Option<String>,
    pub original_language: String,
    pub target_language: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_translated(&self) -> bool {
        self.translated_content.is_some()
    }

    /// Creation time in local `h:mm AM/PM` form.
    pub fn display_time(&self) -> String {
        self.timestamp
            .with_timezone(&Local)
            .format("%-I:%M %p")
            .to_string()
    }
}

/// Request body for `POST /messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub role: Role,
    pub content: String,
    pub original_language: String,
    pub target_language: String,
}

/// Response body for `POST /summary/generate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Body the store attaches to non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}
