use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use hearth_core::{
    BookingRepository, NewReservation, Reservation, RestrictionKind, Room, RoomRestriction,
    StaySpan, StoreError, User,
};
use sqlx::PgPool;
use tracing::error;

/// Column list for room queries.
const ROOM_COLUMNS: &str = "id, name, created_at, updated_at";

/// Column list for reservation queries, room name joined in.
const RESERVATION_COLUMNS: &str = "r.id, r.room_id, rm.name AS room_name, r.first_name, \
    r.last_name, r.email, r.phone, r.start_date, r.end_date, r.processed, r.created_at, \
    r.updated_at";

const RESTRICTION_COLUMNS: &str = "id, room_id, reservation_id, kind, start_date, end_date";

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, password_hash, access_level, created_at, updated_at";

/// Overlap predicate against `[$1, $2)`; see `StaySpan::overlaps`.
const OVERLAPS: &str = "start_date < $2 AND $1 < end_date";

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RoomRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    room_id: i64,
    room_name: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    processed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Reservation {
            id: row.id,
            room_id: row.room_id,
            room_name: row.room_name,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            start_date: row.start_date,
            end_date: row.end_date,
            processed: row.processed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RestrictionRow {
    id: i64,
    room_id: i64,
    reservation_id: Option<i64>,
    kind: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl From<RestrictionRow> for RoomRestriction {
    fn from(row: RestrictionRow) -> Self {
        // The table's CHECK constraint admits exactly these two values.
        let kind = match row.kind.as_str() {
            "owner_block" => RestrictionKind::OwnerBlock,
            _ => RestrictionKind::Reservation,
        };
        RoomRestriction {
            id: row.id,
            room_id: row.room_id,
            reservation_id: row.reservation_id,
            kind,
            start_date: row.start_date,
            end_date: row.end_date,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    access_level: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            access_level: row.access_level,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres raised the gist exclusion constraint: a concurrent writer got
/// the span first.
fn is_exclusion_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23P01"))
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn all_rooms(&self) -> Result<Vec<Room>, StoreError> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms ORDER BY id");
        let rows = sqlx::query_as::<_, RoomRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(rows.into_iter().map(Room::from).collect())
    }

    async fn room_by_id(&self, room_id: i64) -> Result<Room, StoreError> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");
        let row = sqlx::query_as::<_, RoomRow>(&query)
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        row.map(Room::from).ok_or(StoreError::RoomNotFound(room_id))
    }

    async fn rooms_available(&self, span: StaySpan) -> Result<Vec<Room>, StoreError> {
        let query = format!(
            "SELECT {ROOM_COLUMNS} FROM rooms \
             WHERE id NOT IN (\
                 SELECT room_id FROM room_restrictions WHERE {OVERLAPS}\
             ) \
             ORDER BY id"
        );
        let rows = sqlx::query_as::<_, RoomRow>(&query)
            .bind(span.start())
            .bind(span.end())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(rows.into_iter().map(Room::from).collect())
    }

    async fn is_room_available(&self, room_id: i64, span: StaySpan) -> Result<bool, StoreError> {
        let query = format!(
            "SELECT COUNT(*) FROM room_restrictions WHERE room_id = $3 AND {OVERLAPS}"
        );
        let clashes: i64 = sqlx::query_scalar(&query)
            .bind(span.start())
            .bind(span.end())
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(clashes == 0)
    }

    async fn commit_reservation(
        &self,
        new: NewReservation,
    ) -> Result<Reservation, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::unavailable)?;

        // The caller's availability gate ran outside this transaction and
        // may already be stale; check again where the insert can see it.
        let recheck = format!(
            "SELECT COUNT(*) FROM room_restrictions WHERE room_id = $3 AND {OVERLAPS}"
        );
        let clashes: i64 = sqlx::query_scalar(&recheck)
            .bind(new.span.start())
            .bind(new.span.end())
            .bind(new.room_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::unavailable)?;
        if clashes > 0 {
            return Err(StoreError::SpanConflict {
                room_id: new.room_id,
            });
        }

        let reservation_id: i64 = sqlx::query_scalar(
            "INSERT INTO reservations \
                 (room_id, first_name, last_name, email, phone, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(new.room_id)
        .bind(&new.guest.first_name)
        .bind(&new.guest.last_name)
        .bind(&new.guest.email)
        .bind(&new.guest.phone)
        .bind(new.span.start())
        .bind(new.span.end())
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::unavailable)?;

        let restriction = sqlx::query(
            "INSERT INTO room_restrictions \
                 (room_id, reservation_id, kind, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(new.room_id)
        .bind(reservation_id)
        .bind(RestrictionKind::Reservation.as_str())
        .bind(new.span.start())
        .bind(new.span.end())
        .execute(&mut *tx)
        .await;

        if let Err(e) = restriction {
            if is_exclusion_violation(&e) {
                return Err(StoreError::SpanConflict {
                    room_id: new.room_id,
                });
            }
            // Undo the reservation insert before reporting. If even the
            // rollback cannot be confirmed, the reservation row may be
            // sitting there with no blocking restriction; say so loudly.
            if let Err(rollback_err) = tx.rollback().await {
                error!(
                    reservation_id,
                    "rollback failed after restriction insert error: {rollback_err}"
                );
                return Err(StoreError::PartialCommit {
                    reservation_id,
                    source: Box::new(e),
                });
            }
            return Err(StoreError::unavailable(e));
        }

        let fetch = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r \
             JOIN rooms rm ON rm.id = r.room_id \
             WHERE r.id = $1"
        );
        let row = sqlx::query_as::<_, ReservationRow>(&fetch)
            .bind(reservation_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::unavailable)?;

        tx.commit().await.map_err(StoreError::unavailable)?;
        Ok(row.into())
    }

    async fn block_room(
        &self,
        room_id: i64,
        span: StaySpan,
    ) -> Result<RoomRestriction, StoreError> {
        self.room_by_id(room_id).await?;

        let query = format!(
            "INSERT INTO room_restrictions (room_id, kind, start_date, end_date) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {RESTRICTION_COLUMNS}"
        );
        let row = sqlx::query_as::<_, RestrictionRow>(&query)
            .bind(room_id)
            .bind(RestrictionKind::OwnerBlock.as_str())
            .bind(span.start())
            .bind(span.end())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_exclusion_violation(&e) {
                    StoreError::SpanConflict { room_id }
                } else {
                    StoreError::unavailable(e)
                }
            })?;
        Ok(row.into())
    }

    async fn all_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r \
             JOIN rooms rm ON rm.id = r.room_id \
             ORDER BY r.id"
        );
        let rows = sqlx::query_as::<_, ReservationRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn new_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations r \
             JOIN rooms rm ON rm.id = r.room_id \
             WHERE r.processed = FALSE \
             ORDER BY r.id DESC"
        );
        let rows = sqlx::query_as::<_, ReservationRow>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn mark_reservation_processed(&self, reservation_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE reservations SET processed = TRUE, updated_at = now() WHERE id = $1",
        )
        .bind(reservation_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ReservationNotFound(reservation_id));
        }
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::unavailable)?;
        Ok(row.map(User::from))
    }
}
