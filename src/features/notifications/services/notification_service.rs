use std::sync::Arc;

use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::notifications::models::Notification;
use crate::features::notifications::stores::NotificationStore;
use crate::shared::types::PaginationQuery;

/// Read side of the notification inbox
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    pub async fn list_for_user(
        &self,
        user_id: &str,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<Notification>, i64)> {
        self.store
            .list_by_user(user_id, pagination.offset(), pagination.limit())
            .await
    }

    pub async fn mark_read(&self, id: Uuid, user_id: &str) -> Result<Notification> {
        if let Some(notification) = self.store.mark_read(id, user_id).await? {
            return Ok(notification);
        }

        match self.store.get(id).await? {
            Some(_) => Err(AppError::Unauthorized(
                "Notification belongs to another user".to_string(),
            )),
            None => Err(AppError::NotFound(format!(
                "Notification '{}' not found",
                id
            ))),
        }
    }

    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        self.store.mark_all_read(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::notifications::models::NotificationEvent;
    use crate::features::notifications::stores::InMemoryNotificationStore;

    async fn seeded() -> (NotificationService, Arc<InMemoryNotificationStore>, Vec<Uuid>) {
        let store = Arc::new(InMemoryNotificationStore::new());
        let mut ids = Vec::new();
        for i in 0..3 {
            let notification = Notification::from(NotificationEvent::booking_update(
                "citizen-1",
                Uuid::now_v7(),
                format!("title {}", i),
                "message",
            ));
            ids.push(notification.id);
            store.insert(&notification).await.unwrap();
        }
        let other = Notification::from(NotificationEvent::booking_update(
            "citizen-2",
            Uuid::now_v7(),
            "other",
            "message",
        ));
        store.insert(&other).await.unwrap();
        ids.push(other.id);

        (NotificationService::new(store.clone()), store, ids)
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_newest_first() {
        let (service, _, ids) = seeded().await;
        let (items, total) = service
            .list_for_user("citizen-1", &PaginationQuery::default())
            .await
            .unwrap();

        assert_eq!(total, 3);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, ids[2]);
        assert!(items.iter().all(|n| n.user_id == "citizen-1"));
    }

    #[tokio::test]
    async fn test_mark_read_checks_owner() {
        let (service, store, ids) = seeded().await;

        let read = service.mark_read(ids[0], "citizen-1").await.unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());

        assert!(matches!(
            service.mark_read(ids[3], "citizen-1").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(!store.get(ids[3]).await.unwrap().unwrap().is_read);

        assert!(matches!(
            service.mark_read(Uuid::now_v7(), "citizen-1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_all_read_counts_unread_only() {
        let (service, _, ids) = seeded().await;
        service.mark_read(ids[0], "citizen-1").await.unwrap();

        assert_eq!(service.mark_all_read("citizen-1").await.unwrap(), 2);
        assert_eq!(service.mark_all_read("citizen-1").await.unwrap(), 0);
    }
}
