//! Bodies for the raw `/db` repository endpoints. Typed so that only valid enum values
//! reach the store.

use crate::db::models::{
    reservations::{ReservationCreateDBRequest, ReservationStatus, ReservationUpdateDBRequest},
    tables::{TableCreateDBRequest, TableKind, TableStatus, TableUpdateDBRequest},
};
use crate::types::{CustomerId, TableId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRecord {
    pub number: i32,
    #[serde(rename = "type")]
    pub kind: TableKind,
    pub status: TableStatus,
}

impl From<TableRecord> for TableCreateDBRequest {
    fn from(record: TableRecord) -> Self {
        Self {
            number: record.number,
            kind: record.kind,
            status: record.status,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TablePatch {
    pub number: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<TableKind>,
    pub status: Option<TableStatus>,
}

impl From<TablePatch> for TableUpdateDBRequest {
    fn from(patch: TablePatch) -> Self {
        Self {
            number: patch.number,
            kind: patch.kind,
            status: patch.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRecord {
    #[serde(default = "ReservationRecord::default_status")]
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub table_id: TableId,
    pub customer_id: CustomerId,
    pub party_size: i32,
}

impl ReservationRecord {
    fn default_status() -> ReservationStatus {
        ReservationStatus::Pending
    }
}

impl From<ReservationRecord> for ReservationCreateDBRequest {
    fn from(record: ReservationRecord) -> Self {
        Self {
            status: record.status,
            reserved_at: record.reserved_at,
            table_id: record.table_id,
            customer_id: record.customer_id,
            party_size: record.party_size,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReservationPatch {
    pub status: Option<ReservationStatus>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub table_id: Option<TableId>,
    pub party_size: Option<i32>,
}

impl From<ReservationPatch> for ReservationUpdateDBRequest {
    fn from(patch: ReservationPatch) -> Self {
        Self {
            status: patch.status,
            reserved_at: patch.reserved_at,
            table_id: patch.table_id,
            party_size: patch.party_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}
