use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::dates::StaySpan;

/// Contact details collected on the reservation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A fully assembled reservation, validated and ready to commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReservation {
    pub room_id: i64,
    pub span: StaySpan,
    pub guest: GuestDetails,
}

/// A stored reservation row, room name joined in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub room_id: i64,
    pub room_name: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
