pub mod app_config;
pub mod database;
pub mod ticket_repo;

pub use app_config::{BookingRules, Config};
pub use database::DbClient;
pub use ticket_repo::PgTicketStore;
