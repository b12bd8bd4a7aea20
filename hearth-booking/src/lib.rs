pub mod commit;
pub mod draft;
pub mod forms;

pub use commit::{BookingService, CommitError, CommittedReservation, MailSettings};
pub use draft::{DraftError, DraftReservation};
pub use forms::{Form, FormErrors, GuestForm};
