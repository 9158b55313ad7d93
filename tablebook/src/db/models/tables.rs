//! Database models for dining tables.

use crate::types::TableId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Seating category of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "table_kind")]
pub enum TableKind {
    #[serde(rename = "VIP")]
    #[sqlx(rename = "VIP")]
    Vip,
    Regular,
}

impl TableKind {
    pub const ALL: [TableKind; 2] = [TableKind::Vip, TableKind::Regular];

    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Vip => "VIP",
            TableKind::Regular => "Regular",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Invalid table type '{s}'. Allowed values: VIP, Regular"))
    }
}

/// Lifecycle status of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "table_status")]
pub enum TableStatus {
    Available,
    Reserved,
    Occupied,
    #[serde(rename = "Out of service")]
    #[sqlx(rename = "Out of service")]
    OutOfService,
}

impl TableStatus {
    pub const ALL: [TableStatus; 4] = [
        TableStatus::Available,
        TableStatus::Reserved,
        TableStatus::Occupied,
        TableStatus::OutOfService,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TableStatus::Available => "Available",
            TableStatus::Reserved => "Reserved",
            TableStatus::Occupied => "Occupied",
            TableStatus::OutOfService => "Out of service",
        }
    }
}

impl fmt::Display for TableStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|status| status.as_str() == s).ok_or_else(|| {
            format!("Invalid table status '{s}'. Allowed values: Available, Reserved, Occupied, Out of service")
        })
    }
}

/// Database response for a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TableDBResponse {
    pub id: TableId,
    pub number: i32,
    #[sqlx(rename = "table_type")]
    pub kind: TableKind,
    pub status: TableStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating a table
#[derive(Debug, Clone)]
pub struct TableCreateDBRequest {
    pub number: i32,
    pub kind: TableKind,
    pub status: TableStatus,
}

/// Database request for updating a table. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TableUpdateDBRequest {
    pub number: Option<i32>,
    pub kind: Option<TableKind>,
    pub status: Option<TableStatus>,
}

impl TableUpdateDBRequest {
    pub fn status(status: TableStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.number.is_none() && self.kind.is_none() && self.status.is_none()
    }
}

/// Filter for listing tables
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub status: Option<TableStatus>,
}

impl TableFilter {
    pub fn with_status(mut self, status: TableStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_is_exact() {
        assert_eq!("Out of service".parse::<TableStatus>().unwrap(), TableStatus::OutOfService);
        assert_eq!("Reserved".parse::<TableStatus>().unwrap(), TableStatus::Reserved);
        assert!("available".parse::<TableStatus>().is_err());
        assert!("Broken".parse::<TableStatus>().is_err());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("VIP".parse::<TableKind>().unwrap(), TableKind::Vip);
        assert!("vip".parse::<TableKind>().is_err());
    }

    #[test]
    fn test_serde_uses_display_names() {
        assert_eq!(serde_json::to_string(&TableStatus::OutOfService).unwrap(), "\"Out of service\"");
        assert_eq!(serde_json::to_string(&TableKind::Vip).unwrap(), "\"VIP\"");
    }
}
