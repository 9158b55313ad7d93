pub mod database;
pub mod reservations;
pub mod tables;
