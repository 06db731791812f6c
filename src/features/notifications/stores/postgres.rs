use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::NotificationStore;
use crate::core::error::{AppError, Result};
use crate::features::notifications::models::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, category, booking_id, is_read, read_at, created_at";

/// Postgres-backed inbox
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, title, message, category, booking_id, is_read, read_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(notification.id)
        .bind(&notification.user_id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.category)
        .bind(notification.booking_id)
        .bind(notification.is_read)
        .bind(notification.read_at)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert notification: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE id = $1",
            NOTIFICATION_COLUMNS
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to get notification: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Notification>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count notifications: {:?}", e);
                AppError::Database(e)
            })?;

        let sql = format!(
            r#"
            SELECT {} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            NOTIFICATION_COLUMNS
        );
        let items = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list notifications: {:?}", e);
                AppError::Database(e)
            })?;

        Ok((items, total))
    }

    async fn mark_read(&self, id: Uuid, user_id: &str) -> Result<Option<Notification>> {
        let sql = format!(
            r#"
            UPDATE notifications
            SET read_at = COALESCE(read_at, NOW()),
                is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );
        sqlx::query_as::<_, Notification>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to mark notification read: {:?}", e);
                AppError::Database(e)
            })
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE, read_at = NOW()
            WHERE user_id = $1 AND NOT is_read
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark all notifications read: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(result.rows_affected())
    }
}
