use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;
use uuid::Uuid;

/// Notification category enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "notification_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    BookingUpdate,
    System,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationCategory::BookingUpdate => write!(f, "booking_update"),
            NotificationCategory::System => write!(f, "system"),
        }
    }
}

/// Fire-and-forget message handed to a `NotificationSink`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub booking_id: Option<Uuid>,
}

impl NotificationEvent {
    pub fn booking_update(
        user_id: impl Into<String>,
        booking_id: Uuid,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            category: NotificationCategory::BookingUpdate,
            booking_id: Some(booking_id),
        }
    }
}

/// Database model for an inbox entry
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub booking_id: Option<Uuid>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationEvent> for Notification {
    fn from(event: NotificationEvent) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: event.user_id,
            title: event.title,
            message: event.message,
            category: event.category,
            booking_id: event.booking_id,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }
}
