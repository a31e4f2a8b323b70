//! User notification models.

use myteacher_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `user_notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserNotification {
    pub id: DbId,
    pub user_id: DbId,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

/// DTO for inserting a notification.
#[derive(Debug, Clone)]
pub struct CreateUserNotification {
    pub user_id: DbId,
    pub notification_type: String,
    pub title: String,
    pub body: String,
}
