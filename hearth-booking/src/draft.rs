use hearth_core::{Reservation, Room, StaySpan};
use serde::{Deserialize, Serialize};

use crate::forms::GuestForm;

/// The in-progress reservation a session carries between requests. Each
/// variant holds only the fields that step has actually produced, so a
/// handler reaching for something that is not there gets a
/// [`DraftError::MissingState`] instead of a half-filled struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum DraftReservation {
    #[default]
    Empty,
    DatesChosen {
        span: StaySpan,
    },
    RoomChosen {
        span: StaySpan,
        room_id: i64,
    },
    DetailsEntered {
        span: StaySpan,
        room_id: i64,
        guest: GuestForm,
    },
    Committed {
        reservation: Reservation,
        room: Room,
    },
}

impl DraftReservation {
    /// Start a fresh flow from an availability search. Whatever the
    /// session held before is replaced.
    pub fn begin(span: StaySpan) -> Self {
        DraftReservation::DatesChosen { span }
    }

    /// Direct-link entry: dates and room arrive together, starting a
    /// fresh flow in one step.
    pub fn begin_direct(span: StaySpan, room_id: i64) -> Self {
        DraftReservation::RoomChosen { span, room_id }
    }

    /// Record the chosen room. Dates already in the draft stay put, and
    /// guest details entered earlier survive a change of room.
    pub fn choose_room(&mut self, room_id: i64) -> Result<(), DraftError> {
        match self {
            DraftReservation::DatesChosen { span }
            | DraftReservation::RoomChosen { span, .. } => {
                *self = DraftReservation::RoomChosen { span: *span, room_id };
                Ok(())
            }
            DraftReservation::DetailsEntered { span, guest, .. } => {
                let (span, guest) = (*span, guest.clone());
                *self = DraftReservation::DetailsEntered { span, room_id, guest };
                Ok(())
            }
            DraftReservation::Empty | DraftReservation::Committed { .. } => {
                Err(DraftError::MissingState {
                    needed: "chosen dates",
                    action: "choose a room",
                })
            }
        }
    }

    /// Attach submitted guest details. Resubmission after a failed
    /// validation lands here again and overwrites the previous attempt.
    pub fn enter_details(&mut self, guest: GuestForm) -> Result<(), DraftError> {
        match self {
            DraftReservation::RoomChosen { span, room_id }
            | DraftReservation::DetailsEntered { span, room_id, .. } => {
                *self = DraftReservation::DetailsEntered {
                    span: *span,
                    room_id: *room_id,
                    guest,
                };
                Ok(())
            }
            _ => Err(DraftError::MissingState {
                needed: "a chosen room",
                action: "take guest details",
            }),
        }
    }

    /// Swap the draft for the reservation it produced.
    pub fn mark_committed(&mut self, reservation: Reservation, room: Room) -> Result<(), DraftError> {
        match self {
            DraftReservation::DetailsEntered { .. } => {
                *self = DraftReservation::Committed { reservation, room };
                Ok(())
            }
            _ => Err(DraftError::MissingState {
                needed: "guest details",
                action: "record the commit",
            }),
        }
    }

    /// Reset to `Empty`. The confirmation view calls this once it has
    /// rendered the committed reservation.
    pub fn clear(&mut self) {
        *self = DraftReservation::Empty;
    }

    /// Dates carried by the draft, whatever the step.
    pub fn span(&self) -> Option<StaySpan> {
        match self {
            DraftReservation::DatesChosen { span }
            | DraftReservation::RoomChosen { span, .. }
            | DraftReservation::DetailsEntered { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Dates plus room id, the pair the commit path needs.
    pub fn stay(&self) -> Option<(StaySpan, i64)> {
        match self {
            DraftReservation::RoomChosen { span, room_id }
            | DraftReservation::DetailsEntered { span, room_id, .. } => Some((*span, *room_id)),
            _ => None,
        }
    }

    /// Guest details preserved from an earlier submission, for re-rendering
    /// the form.
    pub fn guest(&self) -> Option<&GuestForm> {
        match self {
            DraftReservation::DetailsEntered { guest, .. } => Some(guest),
            _ => None,
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            DraftReservation::Empty => "empty",
            DraftReservation::DatesChosen { .. } => "dates_chosen",
            DraftReservation::RoomChosen { .. } => "room_chosen",
            DraftReservation::DetailsEntered { .. } => "details_entered",
            DraftReservation::Committed { .. } => "committed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// The flow was entered out of order; the caller belongs back at the
    /// availability search.
    #[error("booking draft has no {needed} yet, cannot {action}")]
    MissingState {
        needed: &'static str,
        action: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> StaySpan {
        StaySpan::parse("2050-01-01", "2050-01-02").unwrap()
    }

    fn guest() -> GuestForm {
        GuestForm {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john@smith.com".to_string(),
            phone: "555-555-5555".to_string(),
        }
    }

    #[test]
    fn test_flow_walks_forward_through_the_states() {
        let mut draft = DraftReservation::begin(span());
        assert_eq!(draft.state_name(), "dates_chosen");

        draft.choose_room(1).unwrap();
        assert_eq!(draft.stay(), Some((span(), 1)));

        draft.enter_details(guest()).unwrap();
        assert_eq!(draft.state_name(), "details_entered");
        assert_eq!(draft.guest().unwrap().first_name, "John");
    }

    #[test]
    fn test_entering_details_with_empty_draft_is_missing_state() {
        let mut draft = DraftReservation::Empty;
        let err = draft.enter_details(guest()).unwrap_err();
        assert!(matches!(err, DraftError::MissingState { .. }));
    }

    #[test]
    fn test_choosing_a_room_before_dates_is_missing_state() {
        let mut draft = DraftReservation::Empty;
        assert!(draft.choose_room(1).is_err());
    }

    #[test]
    fn test_details_require_a_room_not_just_dates() {
        let mut draft = DraftReservation::begin(span());
        assert!(draft.enter_details(guest()).is_err());
    }

    #[test]
    fn test_changing_room_keeps_entered_details() {
        let mut draft = DraftReservation::begin(span());
        draft.choose_room(1).unwrap();
        draft.enter_details(guest()).unwrap();

        draft.choose_room(2).unwrap();
        assert_eq!(draft.stay(), Some((span(), 2)));
        assert_eq!(draft.guest().unwrap().email, "john@smith.com");
    }

    #[test]
    fn test_new_search_replaces_the_draft_wholesale() {
        let mut draft = DraftReservation::begin(span());
        draft.choose_room(1).unwrap();
        draft.enter_details(guest()).unwrap();

        let other = StaySpan::parse("2050-02-01", "2050-02-03").unwrap();
        draft = DraftReservation::begin(other);
        assert_eq!(draft.span(), Some(other));
        assert_eq!(draft.stay(), None);
        assert_eq!(draft.guest(), None);
    }

    #[test]
    fn test_direct_link_entry_carries_dates_and_room() {
        let draft = DraftReservation::begin_direct(span(), 2);
        assert_eq!(draft.stay(), Some((span(), 2)));
    }

    #[test]
    fn test_clear_resets_to_empty() {
        let mut draft = DraftReservation::begin(span());
        draft.clear();
        assert!(matches!(draft, DraftReservation::Empty));
    }
}
