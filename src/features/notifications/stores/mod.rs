//! Inbox persistence for delivered notifications.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::notifications::models::Notification;

pub use memory::InMemoryNotificationStore;
pub use postgres::PgNotificationStore;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Newest first, with the total count for the user
    async fn list_by_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Notification>, i64)>;

    /// Applies only when `user_id` owns the entry
    async fn mark_read(&self, id: Uuid, user_id: &str) -> Result<Option<Notification>>;

    /// Returns the number of entries that flipped to read
    async fn mark_all_read(&self, user_id: &str) -> Result<u64>;
}
