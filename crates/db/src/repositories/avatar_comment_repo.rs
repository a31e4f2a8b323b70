//! Repository for the `avatar_comments` table.

use myteacher_core::types::DbId;
use sqlx::PgPool;

use crate::models::avatar_comment::AvatarComment;

const COLUMNS: &str =
    "id, teacher_avatar_id, event_type, comment_text, created_at, updated_at";

pub struct AvatarCommentRepo;

impl AvatarCommentRepo {
    /// Insert or replace the comment for `(avatar_id, event_type)`.
    pub async fn upsert(
        pool: &PgPool,
        avatar_id: DbId,
        event_type: &str,
        comment_text: &str,
    ) -> Result<AvatarComment, sqlx::Error> {
        let query = format!(
            "INSERT INTO avatar_comments (teacher_avatar_id, event_type, comment_text) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (teacher_avatar_id, event_type) \
             DO UPDATE SET comment_text = EXCLUDED.comment_text, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AvatarComment>(&query)
            .bind(avatar_id)
            .bind(event_type)
            .bind(comment_text)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_avatar(
        pool: &PgPool,
        avatar_id: DbId,
    ) -> Result<Vec<AvatarComment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM avatar_comments WHERE teacher_avatar_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, AvatarComment>(&query)
            .bind(avatar_id)
            .fetch_all(pool)
            .await
    }
}
