pub mod clock;
pub mod error;
pub mod event;
pub mod naming;
pub mod repository;
pub mod ticket;
pub mod user;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::LedgerError;
pub use event::Event;
pub use repository::{Reservation, TicketRepository, TicketRequest};
pub use ticket::{Ticket, TicketStatus};
pub use user::{Action, ActionType, User};
