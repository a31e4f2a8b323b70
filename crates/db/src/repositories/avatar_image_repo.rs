//! Repository for the `avatar_images` table.

use myteacher_core::types::DbId;
use sqlx::PgPool;

use crate::models::avatar_image::AvatarImage;

/// Column list for `avatar_images` queries.
const COLUMNS: &str =
    "id, teacher_avatar_id, image_type, expression_type, s3_path, s3_url, created_at, updated_at";

/// Provides upsert and lookup for generated avatar images.
pub struct AvatarImageRepo;

impl AvatarImageRepo {
    /// Insert or replace the image of one (pose, expression) cell.
    ///
    /// Uses `ON CONFLICT` on the cell key, so a later run overwrites the
    /// stored path and URL of an earlier one.
    pub async fn upsert(
        pool: &PgPool,
        avatar_id: DbId,
        image_type: &str,
        expression_type: &str,
        s3_path: &str,
        s3_url: &str,
    ) -> Result<AvatarImage, sqlx::Error> {
        let query = format!(
            "INSERT INTO avatar_images (teacher_avatar_id, image_type, expression_type, s3_path, s3_url) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (teacher_avatar_id, image_type, expression_type) \
             DO UPDATE SET s3_path = EXCLUDED.s3_path, s3_url = EXCLUDED.s3_url, updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AvatarImage>(&query)
            .bind(avatar_id)
            .bind(image_type)
            .bind(expression_type)
            .bind(s3_path)
            .bind(s3_url)
            .fetch_one(pool)
            .await
    }

    /// Find the image stored for one cell.
    pub async fn find_for_cell(
        pool: &PgPool,
        avatar_id: DbId,
        image_type: &str,
        expression_type: &str,
    ) -> Result<Option<AvatarImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM avatar_images \
             WHERE teacher_avatar_id = $1 AND image_type = $2 AND expression_type = $3"
        );
        sqlx::query_as::<_, AvatarImage>(&query)
            .bind(avatar_id)
            .bind(image_type)
            .bind(expression_type)
            .fetch_optional(pool)
            .await
    }

    /// All images of an avatar, ordered by pose then expression.
    pub async fn list_for_avatar(
        pool: &PgPool,
        avatar_id: DbId,
    ) -> Result<Vec<AvatarImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM avatar_images \
             WHERE teacher_avatar_id = $1 \
             ORDER BY image_type, expression_type"
        );
        sqlx::query_as::<_, AvatarImage>(&query)
            .bind(avatar_id)
            .fetch_all(pool)
            .await
    }
}
