use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::AmbulanceStore;
use crate::core::database::map_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::ambulances::models::Ambulance;
use crate::shared::geo::Coordinate;

const AMBULANCE_COLUMNS: &str = r#"
    id, driver_id, vehicle_number, is_available, is_approved,
    latitude, longitude, last_location_update, current_booking_id,
    version, created_at, updated_at
"#;

/// Database row for ambulance
#[derive(Debug, Clone, FromRow)]
struct AmbulanceRow {
    id: Uuid,
    driver_id: String,
    vehicle_number: String,
    is_available: bool,
    is_approved: bool,
    latitude: Option<Decimal>,
    longitude: Option<Decimal>,
    last_location_update: Option<DateTime<Utc>>,
    current_booking_id: Option<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AmbulanceRow> for Ambulance {
    type Error = AppError;

    fn try_from(row: AmbulanceRow) -> Result<Self> {
        let position = Coordinate::from_parts(row.latitude, row.longitude).map_err(|e| {
            AppError::Internal(format!("Stored position of ambulance {} is invalid: {}", row.id, e))
        })?;

        Ok(Self {
            id: row.id,
            driver_id: row.driver_id,
            vehicle_number: row.vehicle_number,
            available: row.is_available,
            approved: row.is_approved,
            position,
            last_location_update: row.last_location_update,
            current_booking_id: row.current_booking_id,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn db_error(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::Database(e)
    }
}

fn one(row: Option<AmbulanceRow>) -> Result<Option<Ambulance>> {
    row.map(Ambulance::try_from).transpose()
}

fn many(rows: Vec<AmbulanceRow>) -> Result<Vec<Ambulance>> {
    rows.into_iter().map(Ambulance::try_from).collect()
}

/// Postgres-backed ambulance store
pub struct PgAmbulanceStore {
    pool: PgPool,
}

impl PgAmbulanceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional(&self, sql: &str, id: Uuid, context: &str) -> Result<Option<Ambulance>> {
        let row = sqlx::query_as::<_, AmbulanceRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error(context))?;
        one(row)
    }

    async fn fetch_all(&self, sql: &str, context: &str) -> Result<Vec<Ambulance>> {
        let rows = sqlx::query_as::<_, AmbulanceRow>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error(context))?;
        many(rows)
    }
}

#[async_trait]
impl AmbulanceStore for PgAmbulanceStore {
    async fn insert(&self, ambulance: &Ambulance) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ambulances (
                id, driver_id, vehicle_number, is_available, is_approved,
                version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(ambulance.id)
        .bind(&ambulance.driver_id)
        .bind(&ambulance.vehicle_number)
        .bind(ambulance.available)
        .bind(ambulance.approved)
        .bind(ambulance.version)
        .bind(ambulance.created_at)
        .bind(ambulance.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "Driver already has an ambulance or vehicle number is taken",
            )
        })?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Ambulance>> {
        let sql = format!("SELECT {} FROM ambulances WHERE id = $1", AMBULANCE_COLUMNS);
        self.fetch_optional(&sql, id, "Failed to get ambulance").await
    }

    async fn find_by_driver(&self, driver_id: &str) -> Result<Option<Ambulance>> {
        let sql = format!(
            "SELECT {} FROM ambulances WHERE driver_id = $1",
            AMBULANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AmbulanceRow>(&sql)
            .bind(driver_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get ambulance by driver"))?;
        one(row)
    }

    async fn list_candidates(&self) -> Result<Vec<Ambulance>> {
        let sql = format!(
            r#"
            SELECT {} FROM ambulances
            WHERE is_available AND is_approved
              AND latitude IS NOT NULL AND longitude IS NOT NULL
            "#,
            AMBULANCE_COLUMNS
        );
        self.fetch_all(&sql, "Failed to list candidate ambulances")
            .await
    }

    async fn list_pending_approval(&self) -> Result<Vec<Ambulance>> {
        let sql = format!(
            "SELECT {} FROM ambulances WHERE NOT is_approved ORDER BY created_at",
            AMBULANCE_COLUMNS
        );
        self.fetch_all(&sql, "Failed to list pending ambulances")
            .await
    }

    async fn list_claimed(&self) -> Result<Vec<Ambulance>> {
        let sql = format!(
            "SELECT {} FROM ambulances WHERE current_booking_id IS NOT NULL",
            AMBULANCE_COLUMNS
        );
        self.fetch_all(&sql, "Failed to list claimed ambulances")
            .await
    }

    async fn claim(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>> {
        // Single conditional write; the WHERE clause is the compare-and-set
        let sql = format!(
            r#"
            UPDATE ambulances
            SET is_available = FALSE,
                current_booking_id = $2,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND is_available AND is_approved
            RETURNING {}
            "#,
            AMBULANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AmbulanceRow>(&sql)
            .bind(id)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to claim ambulance"))?;
        one(row)
    }

    async fn release(&self, id: Uuid, booking_id: Uuid) -> Result<Option<Ambulance>> {
        // A foreign holder fails the WHERE clause; an unclaimed row passes untouched
        let sql = format!(
            r#"
            UPDATE ambulances
            SET version = version + CASE WHEN current_booking_id = $2 THEN 1 ELSE 0 END,
                updated_at = CASE WHEN current_booking_id = $2 THEN NOW() ELSE updated_at END,
                is_available = CASE WHEN current_booking_id = $2 THEN TRUE ELSE is_available END,
                current_booking_id = NULL
            WHERE id = $1 AND (current_booking_id = $2 OR current_booking_id IS NULL)
            RETURNING {}
            "#,
            AMBULANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AmbulanceRow>(&sql)
            .bind(id)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to release ambulance"))?;
        one(row)
    }

    async fn approve(&self, id: Uuid) -> Result<Option<Ambulance>> {
        let sql = format!(
            r#"
            UPDATE ambulances
            SET version = version + CASE WHEN is_approved THEN 0 ELSE 1 END,
                updated_at = CASE WHEN is_approved THEN updated_at ELSE NOW() END,
                is_approved = TRUE
            WHERE id = $1
            RETURNING {}
            "#,
            AMBULANCE_COLUMNS
        );
        self.fetch_optional(&sql, id, "Failed to approve ambulance")
            .await
    }

    async fn update_position(
        &self,
        id: Uuid,
        driver_id: &str,
        position: Coordinate,
        at: DateTime<Utc>,
    ) -> Result<Option<Ambulance>> {
        let sql = format!(
            r#"
            UPDATE ambulances
            SET latitude = $3,
                longitude = $4,
                last_location_update = $5,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND driver_id = $2
            RETURNING {}
            "#,
            AMBULANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AmbulanceRow>(&sql)
            .bind(id)
            .bind(driver_id)
            .bind(position.latitude())
            .bind(position.longitude())
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to update ambulance position"))?;
        one(row)
    }

    async fn set_availability(
        &self,
        id: Uuid,
        driver_id: &str,
        available: bool,
    ) -> Result<Option<Ambulance>> {
        let sql = format!(
            r#"
            UPDATE ambulances
            SET version = version + CASE WHEN is_available = $3 THEN 0 ELSE 1 END,
                updated_at = CASE WHEN is_available = $3 THEN updated_at ELSE NOW() END,
                is_available = $3
            WHERE id = $1 AND driver_id = $2
              AND (NOT $3 OR current_booking_id IS NULL)
            RETURNING {}
            "#,
            AMBULANCE_COLUMNS
        );
        let row = sqlx::query_as::<_, AmbulanceRow>(&sql)
            .bind(id)
            .bind(driver_id)
            .bind(available)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to set ambulance availability"))?;
        one(row)
    }
}
