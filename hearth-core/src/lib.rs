pub mod dates;
pub mod repository;
pub mod reservation;
pub mod restriction;
pub mod room;
pub mod user;

pub use dates::{SpanError, StaySpan};
pub use repository::{BookingRepository, StoreError};
pub use reservation::{GuestDetails, NewReservation, Reservation};
pub use restriction::{RestrictionKind, RoomRestriction};
pub use room::Room;
pub use user::User;
