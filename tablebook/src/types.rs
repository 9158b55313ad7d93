//! Common type definitions.
//!
//! - Type aliases for entity IDs ([`TableId`], [`ReservationId`], [`CustomerId`])
//! - [`Role`]: the kind of account making a request, as issued by the auth service
//! - [`parse_id`]: path-segment parsing shared by the HTTP handlers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::Error;

// Type aliases for IDs
pub type TableId = i64;
pub type ReservationId = i64;
/// Identifies a customer record owned by the external user service.
pub type CustomerId = i64;

/// Account kind carried in the identity token (`tipoUsuario`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "cliente")]
    Customer,
    #[serde(rename = "empleado")]
    Employee,
    #[serde(rename = "administrador")]
    Administrator,
}

impl Role {
    /// Roles allowed on the staff-facing endpoints.
    pub const STAFF: &'static [Role] = &[Role::Employee, Role::Administrator];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Customer => write!(f, "customer"),
            Role::Employee => write!(f, "employee"),
            Role::Administrator => write!(f, "administrator"),
        }
    }
}

/// Parse an integer path segment, naming the parameter in the 400 message.
pub fn parse_id(raw: &str, name: &str) -> Result<i64, Error> {
    raw.trim().parse::<i64>().map_err(|_| Error::BadRequest {
        message: format!("{name} must be a valid integer"),
    })
}
