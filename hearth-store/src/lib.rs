pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod memory_repo;

pub use app_config::{Config, MailTransportKind};
pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use memory_repo::MemoryBookingRepository;
