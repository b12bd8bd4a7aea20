use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use hearth_core::{
    BookingRepository, NewReservation, Reservation, RestrictionKind, Room, RoomRestriction,
    StaySpan, StoreError, User,
};

/// Deterministic in-memory stand-in for the Postgres repository. One lock
/// covers every table, which makes the commit path exactly as atomic as
/// the real transaction. Failure switches reproduce the storage error
/// paths the booking flow has to survive.
#[derive(Default)]
pub struct MemoryBookingRepository {
    inner: Mutex<Tables>,
    fail_availability: AtomicBool,
    fail_reservation: AtomicBool,
    fail_restriction: AtomicBool,
}

#[derive(Default)]
struct Tables {
    rooms: Vec<Room>,
    reservations: Vec<Reservation>,
    restrictions: Vec<RoomRestriction>,
    users: Vec<User>,
    next_room_id: i64,
    next_reservation_id: i64,
    next_restriction_id: i64,
    next_user_id: i64,
}

impl Tables {
    fn overlapping(&self, room_id: i64, span: StaySpan) -> bool {
        self.restrictions
            .iter()
            .any(|x| x.room_id == room_id && span.overlaps_dates(x.start_date, x.end_date))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("simulated {0} failure")]
struct SimulatedFailure(&'static str);

impl MemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a room, handing back the stored record.
    pub fn add_room(&self, name: &str) -> Room {
        let mut t = self.inner.lock().unwrap();
        t.next_room_id += 1;
        let now = Utc::now();
        let room = Room {
            id: t.next_room_id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        t.rooms.push(room.clone());
        room
    }

    /// Seed an admin account with a pre-computed password hash.
    pub fn add_user(&self, email: &str, password_hash: &str) -> User {
        let mut t = self.inner.lock().unwrap();
        t.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: t.next_user_id,
            first_name: "Property".to_string(),
            last_name: "Owner".to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            access_level: 1,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        user
    }

    /// Make single-room availability checks fail as a storage error.
    pub fn fail_availability_checks(&self) {
        self.fail_availability.store(true, Ordering::SeqCst);
    }

    /// Make the next reservation inserts fail cleanly, before any write.
    pub fn fail_reservation_inserts(&self) {
        self.fail_reservation.store(true, Ordering::SeqCst);
    }

    /// Make restriction inserts fail after the reservation row landed,
    /// reproducing the half-committed hazard the error taxonomy names.
    pub fn fail_restriction_inserts(&self) {
        self.fail_restriction.store(true, Ordering::SeqCst);
    }

    /// Restriction rows as stored, for asserting on commit side effects.
    pub fn restrictions(&self) -> Vec<RoomRestriction> {
        self.inner.lock().unwrap().restrictions.clone()
    }
}

#[async_trait]
impl BookingRepository for MemoryBookingRepository {
    async fn all_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.inner.lock().unwrap().rooms.clone())
    }

    async fn room_by_id(&self, room_id: i64) -> Result<Room, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .rooms
            .iter()
            .find(|r| r.id == room_id)
            .cloned()
            .ok_or(StoreError::RoomNotFound(room_id))
    }

    async fn rooms_available(&self, span: StaySpan) -> Result<Vec<Room>, StoreError> {
        let t = self.inner.lock().unwrap();
        Ok(t.rooms
            .iter()
            .filter(|room| !t.overlapping(room.id, span))
            .cloned()
            .collect())
    }

    async fn is_room_available(&self, room_id: i64, span: StaySpan) -> Result<bool, StoreError> {
        if self.fail_availability.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(SimulatedFailure(
                "availability query",
            )));
        }
        Ok(!self.inner.lock().unwrap().overlapping(room_id, span))
    }

    async fn commit_reservation(
        &self,
        new: NewReservation,
    ) -> Result<Reservation, StoreError> {
        let mut t = self.inner.lock().unwrap();

        let room_name = t
            .rooms
            .iter()
            .find(|r| r.id == new.room_id)
            .map(|r| r.name.clone())
            .ok_or(StoreError::RoomNotFound(new.room_id))?;

        // Same re-check the real transaction runs right before writing.
        if t.overlapping(new.room_id, new.span) {
            return Err(StoreError::SpanConflict {
                room_id: new.room_id,
            });
        }

        if self.fail_reservation.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable(SimulatedFailure(
                "reservation insert",
            )));
        }

        t.next_reservation_id += 1;
        let id = t.next_reservation_id;
        let now = Utc::now();
        let reservation = Reservation {
            id,
            room_id: new.room_id,
            room_name,
            first_name: new.guest.first_name.clone(),
            last_name: new.guest.last_name.clone(),
            email: new.guest.email.clone(),
            phone: new.guest.phone.clone(),
            start_date: new.span.start(),
            end_date: new.span.end(),
            processed: false,
            created_at: now,
            updated_at: now,
        };
        t.reservations.push(reservation.clone());

        if self.fail_restriction.load(Ordering::SeqCst) {
            // Leave the reservation row behind: this switch exists to
            // reproduce the half-committed state.
            return Err(StoreError::PartialCommit {
                reservation_id: id,
                source: Box::new(SimulatedFailure("restriction insert")),
            });
        }

        t.next_restriction_id += 1;
        let restriction = RoomRestriction {
            id: t.next_restriction_id,
            room_id: new.room_id,
            reservation_id: Some(id),
            kind: RestrictionKind::Reservation,
            start_date: new.span.start(),
            end_date: new.span.end(),
        };
        t.restrictions.push(restriction);

        Ok(reservation)
    }

    async fn block_room(
        &self,
        room_id: i64,
        span: StaySpan,
    ) -> Result<RoomRestriction, StoreError> {
        let mut t = self.inner.lock().unwrap();

        if !t.rooms.iter().any(|r| r.id == room_id) {
            return Err(StoreError::RoomNotFound(room_id));
        }
        if t.overlapping(room_id, span) {
            return Err(StoreError::SpanConflict { room_id });
        }

        t.next_restriction_id += 1;
        let restriction = RoomRestriction {
            id: t.next_restriction_id,
            room_id,
            reservation_id: None,
            kind: RestrictionKind::OwnerBlock,
            start_date: span.start(),
            end_date: span.end(),
        };
        t.restrictions.push(restriction.clone());
        Ok(restriction)
    }

    async fn all_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        Ok(self.inner.lock().unwrap().reservations.clone())
    }

    async fn new_reservations(&self) -> Result<Vec<Reservation>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .reservations
            .iter()
            .rev()
            .filter(|r| !r.processed)
            .cloned()
            .collect())
    }

    async fn mark_reservation_processed(&self, reservation_id: i64) -> Result<(), StoreError> {
        let mut t = self.inner.lock().unwrap();
        let reservation = t
            .reservations
            .iter_mut()
            .find(|r| r.id == reservation_id)
            .ok_or(StoreError::ReservationNotFound(reservation_id))?;
        reservation.processed = true;
        reservation.updated_at = Utc::now();
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hearth_core::GuestDetails;

    use super::*;

    fn span(start: &str, end: &str) -> StaySpan {
        StaySpan::parse(start, end).unwrap()
    }

    fn guest() -> GuestDetails {
        GuestDetails {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@smith.com".to_string(),
            phone: Some("555-555-5555".to_string()),
        }
    }

    fn reservation_for(room_id: i64, s: &str, e: &str) -> NewReservation {
        NewReservation {
            room_id,
            span: span(s, e),
            guest: guest(),
        }
    }

    #[tokio::test]
    async fn test_half_open_overlap_rule() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");
        repo.block_room(room.id, span("2050-01-10", "2050-01-15"))
            .await
            .unwrap();

        // Entirely before, entirely after, and touching at either edge
        // are all free under half-open intervals.
        for (s, e) in [
            ("2050-01-01", "2050-01-05"),
            ("2050-01-20", "2050-01-25"),
            ("2050-01-05", "2050-01-10"),
            ("2050-01-15", "2050-01-20"),
        ] {
            assert!(
                repo.is_room_available(room.id, span(s, e)).await.unwrap(),
                "{s}..{e} should be free"
            );
        }

        // Straddling, contained, containing, and identical all clash.
        for (s, e) in [
            ("2050-01-08", "2050-01-11"),
            ("2050-01-14", "2050-01-18"),
            ("2050-01-11", "2050-01-13"),
            ("2050-01-05", "2050-01-20"),
            ("2050-01-10", "2050-01-15"),
        ] {
            assert!(
                !repo.is_room_available(room.id, span(s, e)).await.unwrap(),
                "{s}..{e} should clash"
            );
        }
    }

    #[tokio::test]
    async fn test_room_without_restrictions_is_trivially_available() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("Major's Suite");
        assert!(repo
            .is_room_available(room.id, span("2050-01-01", "2050-01-02"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_rooms_available_is_idempotent_without_writes() {
        let repo = MemoryBookingRepository::new();
        repo.add_room("General's Quarters");
        repo.add_room("Major's Suite");
        let ask = span("2050-01-01", "2050-01-03");

        let first: Vec<i64> = repo
            .rooms_available(ask)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        let second: Vec<i64> = repo
            .rooms_available(ask)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_commit_writes_the_pair_together() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");

        let stored = repo
            .commit_reservation(reservation_for(room.id, "2050-01-01", "2050-01-02"))
            .await
            .unwrap();

        let restrictions = repo.restrictions();
        assert_eq!(repo.all_reservations().await.unwrap().len(), 1);
        assert_eq!(restrictions.len(), 1);
        let restriction = &restrictions[0];
        assert_eq!(restriction.kind, RestrictionKind::Reservation);
        assert_eq!(restriction.reservation_id, Some(stored.id));
        assert_eq!(restriction.room_id, room.id);
        assert_eq!(restriction.start_date, stored.start_date);
        assert_eq!(restriction.end_date, stored.end_date);
    }

    #[tokio::test]
    async fn test_clean_commit_failure_leaves_no_records() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");
        repo.fail_reservation_inserts();

        let err = repo
            .commit_reservation(reservation_for(room.id, "2050-01-01", "2050-01-02"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(repo.all_reservations().await.unwrap().is_empty());
        assert!(repo.restrictions().is_empty());
    }

    #[tokio::test]
    async fn test_conflicting_commit_leaves_no_records() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");
        repo.commit_reservation(reservation_for(room.id, "2050-01-01", "2050-01-05"))
            .await
            .unwrap();

        let err = repo
            .commit_reservation(reservation_for(room.id, "2050-01-04", "2050-01-06"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SpanConflict { .. }));
        assert_eq!(repo.all_reservations().await.unwrap().len(), 1);
        assert_eq!(repo.restrictions().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_commit_reports_the_orphaned_row() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");
        repo.fail_restriction_inserts();

        let err = repo
            .commit_reservation(reservation_for(room.id, "2050-01-01", "2050-01-02"))
            .await
            .unwrap_err();
        match err {
            StoreError::PartialCommit { reservation_id, .. } => {
                assert_eq!(repo.all_reservations().await.unwrap()[0].id, reservation_id);
            }
            other => panic!("expected partial commit, got {other:?}"),
        }
        assert!(repo.restrictions().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_commits_for_one_span_produce_one_winner() {
        let repo = Arc::new(MemoryBookingRepository::new());
        let room = repo.add_room("General's Quarters");

        let a = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.commit_reservation(reservation_for(room.id, "2050-01-01", "2050-01-05"))
                    .await
            })
        };
        let b = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.commit_reservation(reservation_for(room.id, "2050-01-03", "2050-01-07"))
                    .await
            })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(wins, 1, "exactly one of two overlapping commits may land");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(StoreError::SpanConflict { .. }))));
        assert_eq!(repo.all_reservations().await.unwrap().len(), 1);
        assert_eq!(repo.restrictions().len(), 1);
    }

    #[tokio::test]
    async fn test_owner_block_closes_the_dates() {
        let repo = MemoryBookingRepository::new();
        let quarters = repo.add_room("General's Quarters");
        let suite = repo.add_room("Major's Suite");

        repo.block_room(quarters.id, span("2050-02-01", "2050-02-10"))
            .await
            .unwrap();

        let free = repo
            .rooms_available(span("2050-02-03", "2050-02-05"))
            .await
            .unwrap();
        let ids: Vec<i64> = free.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![suite.id]);
    }

    #[tokio::test]
    async fn test_block_conflicts_with_existing_reservation() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");
        repo.commit_reservation(reservation_for(room.id, "2050-03-01", "2050-03-05"))
            .await
            .unwrap();

        let err = repo
            .block_room(room.id, span("2050-03-04", "2050-03-08"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SpanConflict { .. }));
    }

    #[tokio::test]
    async fn test_processed_flag_drives_the_new_listing() {
        let repo = MemoryBookingRepository::new();
        let room = repo.add_room("General's Quarters");
        let first = repo
            .commit_reservation(reservation_for(room.id, "2050-04-01", "2050-04-02"))
            .await
            .unwrap();
        let second = repo
            .commit_reservation(reservation_for(room.id, "2050-04-10", "2050-04-12"))
            .await
            .unwrap();

        // Newest first while both are unprocessed.
        let fresh: Vec<i64> = repo
            .new_reservations()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(fresh, vec![second.id, first.id]);

        repo.mark_reservation_processed(second.id).await.unwrap();
        let fresh: Vec<i64> = repo
            .new_reservations()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(fresh, vec![first.id]);

        assert!(matches!(
            repo.mark_reservation_processed(9999).await.unwrap_err(),
            StoreError::ReservationNotFound(9999)
        ));
    }

    #[tokio::test]
    async fn test_user_lookup_by_email() {
        let repo = MemoryBookingRepository::new();
        repo.add_user("owner@hearth.test", "$argon2id$not-a-real-hash");

        let found = repo.user_by_email("owner@hearth.test").await.unwrap();
        assert_eq!(found.unwrap().email, "owner@hearth.test");
        assert!(repo.user_by_email("nobody@hearth.test").await.unwrap().is_none());
    }
}
