use std::sync::Arc;

use async_trait::async_trait;
use myteacher_events::bus::{EVENT_AVATAR_GENERATION_COMPLETED, EVENT_AVATAR_GENERATION_FAILED};
use myteacher_events::{EventBus, PlatformEvent};

use crate::ports::{Notification, Notifier};

/// Publishes run notifications on the event bus; the persistence
/// subscriber stores them.
pub struct EventNotifier {
    bus: Arc<EventBus>,
}

impl EventNotifier {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

/// Bus event for a run notification.
pub fn notification_event(notification: &Notification) -> PlatformEvent {
    let event_type = if notification.succeeded {
        EVENT_AVATAR_GENERATION_COMPLETED
    } else {
        EVENT_AVATAR_GENERATION_FAILED
    };
    PlatformEvent::notification(
        event_type,
        notification.user_id,
        &notification.title,
        &notification.body,
    )
    .with_source("teacher_avatar", notification.avatar_id)
}

#[async_trait]
impl Notifier for EventNotifier {
    async fn send(&self, notification: Notification) {
        tracing::debug!(
            user_id = notification.user_id,
            avatar_id = notification.avatar_id,
            succeeded = notification.succeeded,
            "Publishing generation notification"
        );
        self.bus.publish(notification_event(&notification));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
