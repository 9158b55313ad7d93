//! Row types and request structs exchanged with the repositories.

pub mod reservations;
pub mod tables;
