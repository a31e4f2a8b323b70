//! Character profile used as the read-only input of a generation run.
//!
//! Appearance and personality attributes are kept as the raw option keys
//! stored on the avatar row. Vocabulary lookups happen in
//! [`crate::prompt`] and [`crate::comment`], where unknown keys degrade
//! gracefully instead of failing the run.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

/// UI theme of the owning user. Alters prompt and comment vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Adult,
    Child,
}

impl Theme {
    /// String representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Adult => "adult",
            Theme::Child => "child",
        }
    }

    /// Parse from a string, defaulting to `Adult` for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s {
            "child" => Theme::Child,
            _ => Theme::Adult,
        }
    }

    /// Role noun used in image prompts.
    pub fn role_noun(&self) -> &'static str {
        match self {
            Theme::Adult => "teacher",
            Theme::Child => "supporter",
        }
    }

    pub fn is_child(&self) -> bool {
        matches!(self, Theme::Child)
    }
}

// ---------------------------------------------------------------------------
// Personality
// ---------------------------------------------------------------------------

/// Personality axes chosen by the user when configuring the avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Personality {
    pub tone: String,
    pub enthusiasm: String,
    pub formality: String,
    pub humor: String,
}

// ---------------------------------------------------------------------------
// CharacterProfile
// ---------------------------------------------------------------------------

/// Everything a generation run needs to know about one avatar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub sex: String,
    pub hair_style: String,
    pub hair_color: String,
    pub eye_color: String,
    pub clothing: String,
    pub accessory: Option<String>,
    pub body_type: String,
    pub personality: Personality,
    pub is_chibi: bool,
    pub is_transparent: bool,
    pub draw_model_version: Option<String>,
    /// Stable seed shared by every image of the character.
    pub seed: i64,
    pub theme: Theme,
}

impl CharacterProfile {
    /// Model name used for generation and pricing, falling back to
    /// `default_model` when the avatar has none configured.
    pub fn model_name<'a>(&'a self, default_model: &'a str) -> &'a str {
        match self.draw_model_version.as_deref() {
            Some(model) if !model.trim().is_empty() => model,
            _ => default_model,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
