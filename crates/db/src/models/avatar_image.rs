//! Generated avatar image entity.

use myteacher_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `avatar_images` table. One per (avatar, pose, expression).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvatarImage {
    pub id: DbId,
    pub teacher_avatar_id: DbId,
    pub image_type: String,
    pub expression_type: String,
    pub s3_path: String,
    pub s3_url: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
