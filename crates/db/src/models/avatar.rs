//! Teacher avatar entity and its conversion into a generation profile.

use myteacher_core::generation::AvatarGenerationStatus;
use myteacher_core::profile::{CharacterProfile, Personality, Theme};
use myteacher_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `teacher_avatars` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeacherAvatar {
    pub id: DbId,
    pub user_id: DbId,
    pub sex: String,
    pub hair_style: String,
    pub hair_color: String,
    pub eye_color: String,
    pub clothing: String,
    pub accessory: Option<String>,
    pub body_type: String,
    pub tone: String,
    pub enthusiasm: String,
    pub formality: String,
    pub humor: String,
    pub is_chibi: bool,
    pub is_transparent: bool,
    pub draw_model_version: Option<String>,
    pub seed: i64,
    pub generation_status: String,
    pub generation_claimed_at: Option<Timestamp>,
    pub last_generated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TeacherAvatar {
    /// Parsed generation status. Unknown values read as `Pending`.
    pub fn status(&self) -> AvatarGenerationStatus {
        AvatarGenerationStatus::from_str(&self.generation_status)
            .unwrap_or(AvatarGenerationStatus::Pending)
    }

    /// Build the run input for this avatar, given its owner's theme.
    pub fn to_profile(&self, theme: Theme) -> CharacterProfile {
        CharacterProfile {
            sex: self.sex.clone(),
            hair_style: self.hair_style.clone(),
            hair_color: self.hair_color.clone(),
            eye_color: self.eye_color.clone(),
            clothing: self.clothing.clone(),
            accessory: self.accessory.clone(),
            body_type: self.body_type.clone(),
            personality: Personality {
                tone: self.tone.clone(),
                enthusiasm: self.enthusiasm.clone(),
                formality: self.formality.clone(),
                humor: self.humor.clone(),
            },
            is_chibi: self.is_chibi,
            is_transparent: self.is_transparent,
            draw_model_version: self.draw_model_version.clone(),
            seed: self.seed,
            theme,
        }
    }
}

/// DTO for inserting an avatar.
#[derive(Debug, Clone)]
pub struct CreateTeacherAvatar {
    pub user_id: DbId,
    pub sex: String,
    pub hair_style: String,
    pub hair_color: String,
    pub eye_color: String,
    pub clothing: String,
    pub accessory: Option<String>,
    pub body_type: String,
    pub tone: String,
    pub enthusiasm: String,
    pub formality: String,
    pub humor: String,
    pub is_chibi: bool,
    pub is_transparent: bool,
    pub draw_model_version: Option<String>,
    pub seed: i64,
}
