use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::NotificationStore;
use crate::core::error::Result;
use crate::features::notifications::models::Notification;

/// In-memory inbox keyed by notification id
#[derive(Default)]
pub struct InMemoryNotificationStore {
    records: DashMap<Uuid, Notification>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.records.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        Ok(self.records.get(&id).map(|r| r.value().clone()))
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Notification>, i64)> {
        let mut items: Vec<Notification> = self
            .records
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        // v7 ids are time-ordered, so they break created_at ties
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = items.len() as i64;
        let page = items
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn mark_read(&self, id: Uuid, user_id: &str) -> Result<Option<Notification>> {
        let Some(mut record) = self.records.get_mut(&id) else {
            return Ok(None);
        };
        if record.user_id != user_id {
            return Ok(None);
        }
        if !record.is_read {
            record.is_read = true;
            record.read_at = Some(Utc::now());
        }
        Ok(Some(record.clone()))
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let now = Utc::now();
        let mut updated = 0;
        for mut record in self.records.iter_mut() {
            if record.user_id == user_id && !record.is_read {
                record.is_read = true;
                record.read_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }
}
