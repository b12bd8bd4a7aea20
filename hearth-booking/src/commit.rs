use std::sync::Arc;

use hearth_core::{
    BookingRepository, NewReservation, Reservation, Room, StaySpan, StoreError,
};
use hearth_notify::{Mailer, NotificationJob};
use serde::Serialize;
use tracing::info;

use crate::forms::{FormErrors, GuestForm};

/// Addresses the notification jobs are composed with.
#[derive(Debug, Clone)]
pub struct MailSettings {
    /// Sender on everything the property mails out.
    pub from: String,
    /// Where owner notices go.
    pub owner: String,
}

/// What a successful commit hands back: the stored row plus the room it
/// re-resolved on the way in.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedReservation {
    pub reservation: Reservation,
    pub room: Room,
}

/// The booking workflow: availability lookups on the way in, the gated
/// commit sequence on the way out.
pub struct BookingService {
    repo: Arc<dyn BookingRepository>,
    mailer: Mailer,
    mail: MailSettings,
}

impl BookingService {
    pub fn new(repo: Arc<dyn BookingRepository>, mailer: Mailer, mail: MailSettings) -> Self {
        Self { repo, mailer, mail }
    }

    pub async fn rooms(&self) -> Result<Vec<Room>, StoreError> {
        self.repo.all_rooms().await
    }

    pub async fn room(&self, room_id: i64) -> Result<Room, StoreError> {
        self.repo.room_by_id(room_id).await
    }

    /// Rooms free for the whole span.
    pub async fn search(&self, span: StaySpan) -> Result<Vec<Room>, StoreError> {
        self.repo.rooms_available(span).await
    }

    /// Availability probe for a single room.
    pub async fn probe(&self, room_id: i64, span: StaySpan) -> Result<bool, StoreError> {
        self.repo.is_room_available(room_id, span).await
    }

    /// Turn a completed draft into a stored reservation. The gates run in
    /// order and each one ends the sequence: form validation (no storage
    /// touched), room re-resolution, availability re-check, atomic insert.
    /// Notifications are queued only once the insert has committed.
    pub async fn commit(
        &self,
        room_id: i64,
        span: StaySpan,
        form: &GuestForm,
    ) -> Result<CommittedReservation, CommitError> {
        let guest = form.validate().map_err(CommitError::Validation)?;

        let room = match self.repo.room_by_id(room_id).await {
            Ok(room) => room,
            Err(StoreError::RoomNotFound(id)) => return Err(CommitError::RoomNotFound(id)),
            Err(e) => return Err(e.into()),
        };

        // The draft may be minutes old; re-check right before the write.
        if !self.repo.is_room_available(room_id, span).await? {
            return Err(CommitError::RoomNoLongerAvailable(room_id));
        }

        let reservation = match self
            .repo
            .commit_reservation(NewReservation { room_id, span, guest })
            .await
        {
            Ok(reservation) => reservation,
            // Beaten between the re-check and the insert; same outcome for
            // the guest as failing the re-check.
            Err(StoreError::SpanConflict { room_id }) => {
                return Err(CommitError::RoomNoLongerAvailable(room_id))
            }
            Err(e @ StoreError::PartialCommit { .. }) => {
                return Err(CommitError::PartialCommit(e))
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            reservation_id = reservation.id,
            room = %room.name,
            start = %reservation.start_date,
            end = %reservation.end_date,
            "reservation committed"
        );

        self.mailer.enqueue(self.guest_confirmation(&reservation));
        self.mailer.enqueue(self.owner_notice(&reservation));

        Ok(CommittedReservation { reservation, room })
    }

    fn guest_confirmation(&self, r: &Reservation) -> NotificationJob {
        NotificationJob {
            to: r.email.clone(),
            from: self.mail.from.clone(),
            subject: "Reservation Confirmation".to_string(),
            body: format!(
                "Dear {},\n\nThis is to confirm your reservation of {} from {} to {}.",
                r.first_name, r.room_name, r.start_date, r.end_date
            ),
            template: Some("reservation-confirmation".to_string()),
        }
    }

    fn owner_notice(&self, r: &Reservation) -> NotificationJob {
        NotificationJob {
            to: self.mail.owner.clone(),
            from: self.mail.from.clone(),
            subject: "Reservation Notification".to_string(),
            body: format!(
                "A reservation has been made for {} from {} to {}.",
                r.room_name, r.start_date, r.end_date
            ),
            template: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("reservation form failed validation")]
    Validation(FormErrors),

    #[error("room not found: {0}")]
    RoomNotFound(i64),

    #[error("room {0} is no longer available for the requested dates")]
    RoomNoLongerAvailable(i64),

    /// Step four broke half way: the reservation row may exist without its
    /// blocking restriction. Never presented as a user mistake.
    #[error(transparent)]
    PartialCommit(StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
