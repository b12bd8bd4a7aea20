use async_trait::async_trait;

use crate::dates::StaySpan;
use crate::reservation::{NewReservation, Reservation};
use crate::restriction::RoomRestriction;
use crate::room::Room;
use crate::user::User;

/// Storage contract for the booking engine. One implementation talks to
/// Postgres, one keeps everything behind a mutex for tests.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Every room on the property, ordered by id.
    async fn all_rooms(&self) -> Result<Vec<Room>, StoreError>;

    /// Look up a single room. `RoomNotFound` when the id is unknown.
    async fn room_by_id(&self, room_id: i64) -> Result<Room, StoreError>;

    /// Rooms with no restriction overlapping the span.
    async fn rooms_available(&self, span: StaySpan) -> Result<Vec<Room>, StoreError>;

    /// Whether one room is free for the whole span.
    async fn is_room_available(&self, room_id: i64, span: StaySpan) -> Result<bool, StoreError>;

    /// Insert the reservation and its covering restriction as one atomic
    /// unit. The span is re-checked against existing restrictions inside
    /// the same unit, so of two concurrent commits for overlapping spans
    /// exactly one can succeed; the loser gets `SpanConflict`.
    async fn commit_reservation(
        &self,
        reservation: NewReservation,
    ) -> Result<Reservation, StoreError>;

    /// Owner-initiated block, closing the span without a reservation.
    /// Conflicts with existing restrictions the same way commits do.
    async fn block_room(&self, room_id: i64, span: StaySpan)
        -> Result<RoomRestriction, StoreError>;

    async fn all_reservations(&self) -> Result<Vec<Reservation>, StoreError>;

    /// Reservations the owner has not marked processed yet, newest first.
    async fn new_reservations(&self) -> Result<Vec<Reservation>, StoreError>;

    async fn mark_reservation_processed(&self, reservation_id: i64) -> Result<(), StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("room not found: {0}")]
    RoomNotFound(i64),

    #[error("reservation not found: {0}")]
    ReservationNotFound(i64),

    #[error("span conflicts with an existing restriction for room {room_id}")]
    SpanConflict { room_id: i64 },

    /// The reservation row landed but its restriction did not, and the
    /// store could not undo the insert. Availability queries will not see
    /// this reservation until an operator repairs it.
    #[error("reservation {reservation_id} stored without its restriction: {source}")]
    PartialCommit {
        reservation_id: i64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap a backend error that maps to no domain condition.
    pub fn unavailable<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Unavailable(Box::new(err))
    }
}
