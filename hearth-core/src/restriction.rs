use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Why a span of dates is closed off for a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    /// Backing row for a committed reservation.
    Reservation,
    /// Owner took the room out of service, no reservation attached.
    OwnerBlock,
}

impl RestrictionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestrictionKind::Reservation => "reservation",
            RestrictionKind::OwnerBlock => "owner_block",
        }
    }
}

/// One blocked-off span for a room. Every availability query runs against
/// these rows, so a committed reservation and an owner block close dates
/// the same way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRestriction {
    pub id: i64,
    pub room_id: i64,
    pub reservation_id: Option<i64>,
    pub kind: RestrictionKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}
