pub mod ledger;
pub mod memory;

pub use ledger::TicketLedger;
pub use memory::InMemoryTicketStore;
