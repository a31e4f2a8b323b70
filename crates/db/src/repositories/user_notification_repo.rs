//! Repository for the `user_notifications` table.

use myteacher_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{CreateUserNotification, UserNotification};

const COLUMNS: &str = "id, user_id, notification_type, title, body, is_read, created_at";

pub struct UserNotificationRepo;

impl UserNotificationRepo {
    /// Insert a notification, returning the generated ID.
    pub async fn create(
        pool: &PgPool,
        input: &CreateUserNotification,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO user_notifications (user_id, notification_type, title, body) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(input.user_id)
        .bind(&input.notification_type)
        .bind(&input.title)
        .bind(&input.body)
        .fetch_one(pool)
        .await
    }

    /// Most recent notifications for a user.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        limit: i64,
    ) -> Result<Vec<UserNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_notifications \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, UserNotification>(&query)
            .bind(user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
