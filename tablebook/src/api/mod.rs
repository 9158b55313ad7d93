//! HTTP surface: request/response models and the axum handlers that use them.

pub mod extract;
pub mod handlers;
pub mod models;

pub use extract::ApiJson;
