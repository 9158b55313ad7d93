//! Persistence layer: row models, repositories, and the stores that hand them out.

pub mod errors;
pub mod handlers;
pub mod models;
