//! Notification persistence service.
//!
//! [`NotificationPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every user-addressed [`PlatformEvent`] carrying a title to
//! the `user_notifications` table. It runs as a long-lived background task
//! and stops when the bus sender is dropped.

use myteacher_core::types::DbId;
use myteacher_db::models::notification::CreateUserNotification;
use myteacher_db::repositories::UserNotificationRepo;
use myteacher_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::PlatformEvent;

/// Background service that persists notification events.
pub struct NotificationPersistence;

impl NotificationPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let Some(notification) = notification_from_event(&event) else {
                        tracing::trace!(event_type = %event.event_type, "Event is not a notification");
                        continue;
                    };
                    match UserNotificationRepo::create(&pool, &notification).await {
                        Ok(id) => tracing::debug!(
                            notification_id = id,
                            user_id = notification.user_id,
                            event_type = %event.event_type,
                            "Notification stored"
                        ),
                        Err(e) => tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist notification"
                        ),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Notification persistence lagged, some notifications were not stored"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification persistence shutting down");
                    break;
                }
            }
        }
    }
}

/// Map an event to a notification row.
///
/// Requires an actor user and a string `title` in the payload; `body`
/// defaults to empty.
pub fn notification_from_event(event: &PlatformEvent) -> Option<CreateUserNotification> {
    let user_id: DbId = event.actor_user_id?;
    let title = event.payload.get("title")?.as_str()?;
    let body = event
        .payload
        .get("body")
        .and_then(|b| b.as_str())
        .unwrap_or_default();

    Some(CreateUserNotification {
        user_id,
        notification_type: event.event_type.clone(),
        title: title.to_string(),
        body: body.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
