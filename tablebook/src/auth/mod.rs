//! Identity tokens and per-request caller extraction.

pub mod current_user;
pub mod session;

pub use current_user::CurrentUser;
