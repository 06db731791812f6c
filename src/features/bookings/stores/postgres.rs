use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::BookingStore;
use crate::core::database::map_unique_violation;
use crate::core::error::{AppError, Result};
use crate::features::bookings::models::{Booking, BookingStatus, BookingTransition};
use crate::shared::geo::Coordinate;

const BOOKING_COLUMNS: &str = r#"
    id, citizen_id, ambulance_id,
    pickup_latitude, pickup_longitude, destination_latitude, destination_longitude,
    status, requested_at, assigned_at, completed_at, updated_at
"#;

/// Database row for booking
#[derive(Debug, Clone, FromRow)]
struct BookingRow {
    id: Uuid,
    citizen_id: String,
    ambulance_id: Option<Uuid>,
    pickup_latitude: Decimal,
    pickup_longitude: Decimal,
    destination_latitude: Option<Decimal>,
    destination_longitude: Option<Decimal>,
    status: BookingStatus,
    requested_at: DateTime<Utc>,
    assigned_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> Result<Self> {
        let id = row.id;
        let invalid = |e: AppError| {
            AppError::Internal(format!("Stored coordinates of booking {} are invalid: {}", id, e))
        };
        let pickup = Coordinate::new(row.pickup_latitude, row.pickup_longitude).map_err(invalid)?;
        let destination =
            Coordinate::from_parts(row.destination_latitude, row.destination_longitude)
                .map_err(invalid)?;

        Ok(Self {
            id: row.id,
            citizen_id: row.citizen_id,
            ambulance_id: row.ambulance_id,
            pickup,
            destination,
            status: row.status,
            requested_at: row.requested_at,
            assigned_at: row.assigned_at,
            completed_at: row.completed_at,
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

/// Postgres-backed booking store
pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, citizen_id, ambulance_id,
                pickup_latitude, pickup_longitude, destination_latitude, destination_longitude,
                status, requested_at, assigned_at, completed_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(booking.id)
        .bind(&booking.citizen_id)
        .bind(booking.ambulance_id)
        .bind(booking.pickup.latitude())
        .bind(booking.pickup.longitude())
        .bind(booking.destination.map(|d| d.latitude()))
        .bind(booking.destination.map(|d| d.longitude()))
        .bind(booking.status)
        .bind(booking.requested_at)
        .bind(booking.assigned_at)
        .bind(booking.completed_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Booking already exists"))?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get booking"))?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_by_citizen(
        &self,
        citizen_id: &str,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Booking>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE citizen_id = $1")
            .bind(citizen_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count bookings"))?;

        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE citizen_id = $1
            ORDER BY requested_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(citizen_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list bookings"))?;

        let items = rows
            .into_iter()
            .map(Booking::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn list_active_by_ambulance(&self, ambulance_id: Uuid) -> Result<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE ambulance_id = $1
              AND status IN ('ASSIGNED', 'EN_ROUTE', 'ARRIVED')
            ORDER BY requested_at
            "#,
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(ambulance_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list ambulance bookings"))?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_requested(&self, limit: i64) -> Result<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT {} FROM bookings
            WHERE status = 'REQUESTED'
            ORDER BY requested_at, id
            LIMIT $1
            "#,
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to list requested bookings"))?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn transition(
        &self,
        id: Uuid,
        expected: BookingStatus,
        transition: BookingTransition,
    ) -> Result<Option<Booking>> {
        // The status predicate in each WHERE clause is the compare-and-set
        let (ambulance_id, assigned_at, completed_at) = match transition {
            BookingTransition::Assign { ambulance_id, at } => (Some(ambulance_id), Some(at), None),
            BookingTransition::Advance { to, at } if to == BookingStatus::Completed => {
                (None, None, Some(at))
            }
            BookingTransition::Advance { .. } | BookingTransition::Cancel => (None, None, None),
        };

        let sql = format!(
            r#"
            UPDATE bookings
            SET status = $3,
                ambulance_id = COALESCE($4, ambulance_id),
                assigned_at = CASE
                    WHEN $5::timestamptz IS NULL THEN assigned_at
                    ELSE GREATEST($5, requested_at)
                END,
                completed_at = CASE
                    WHEN $6::timestamptz IS NULL THEN completed_at
                    ELSE GREATEST($6, COALESCE(assigned_at, requested_at))
                END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(expected)
            .bind(transition.target())
            .bind(ambulance_id)
            .bind(assigned_at)
            .bind(completed_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to transition booking"))?;
        row.map(Booking::try_from).transpose()
    }
}
