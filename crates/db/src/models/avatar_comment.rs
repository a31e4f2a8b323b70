use myteacher_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `avatar_comments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AvatarComment {
    pub id: DbId,
    pub teacher_avatar_id: DbId,
    pub event_type: String,
    pub comment_text: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
