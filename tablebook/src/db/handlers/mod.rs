//! Repositories and the stores that scope them to a unit of work.

pub mod in_memory;
pub mod repository;
pub mod reservations;
pub mod store;
pub mod tables;

#[cfg(test)]
mod tests;

pub use in_memory::InMemoryStore;
pub use repository::{ReservationRepository, Repository, TableRepository};
pub use reservations::Reservations;
pub use store::{PgStore, Session, Store};
pub use tables::Tables;
