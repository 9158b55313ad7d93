//! API request/response models for tables.

use crate::db::models::tables::{TableDBResponse, TableKind, TableStatus};
use crate::services::StatusChange;
use crate::types::TableId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for creating a table. Fields are validated by the service so that a
/// missing or unknown value produces a specific message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableCreate {
    pub number: Option<i32>,
    /// `VIP` or `Regular`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

/// Request body for updating a table. Only provided fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableUpdate {
    pub number: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableStatusUpdate {
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResponse {
    pub id: TableId,
    pub number: i32,
    #[serde(rename = "type")]
    pub kind: TableKind,
    pub status: TableStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TableDBResponse> for TableResponse {
    fn from(db: TableDBResponse) -> Self {
        Self {
            id: db.id,
            number: db.number,
            kind: db.kind,
            status: db.status,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// A list of tables. `message` explains an empty result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableListResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total: usize,
    pub tables: Vec<TableResponse>,
}

impl TableListResponse {
    pub fn new(tables: Vec<TableDBResponse>, empty_message: impl Into<String>) -> Self {
        Self {
            message: tables.is_empty().then(|| empty_message.into()),
            total: tables.len(),
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }
}

/// Outcome of a staff status change. `changed` is `false` for a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableStatusChangeResponse {
    pub message: String,
    pub changed: bool,
    pub table: TableResponse,
}

impl From<StatusChange> for TableStatusChangeResponse {
    fn from(change: StatusChange) -> Self {
        let message = if change.changed {
            format!("Table status updated to {}", change.table.status)
        } else {
            format!("Table is already {}; no change needed", change.table.status)
        };
        Self {
            message,
            changed: change.changed,
            table: change.table.into(),
        }
    }
}
