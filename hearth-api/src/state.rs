use std::sync::Arc;

use hearth_booking::BookingService;
use hearth_core::BookingRepository;

use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    /// Storage handle for the admin surface.
    pub repo: Arc<dyn BookingRepository>,
    /// The guest booking flow.
    pub booking: Arc<BookingService>,
    pub sessions: SessionStore,
}
