//! Business rules over the repositories.

pub mod reservations;
pub mod tables;

pub use reservations::{NewReservation, ReservationService};
pub use tables::{StatusChange, StatusUpdate, TableService};
