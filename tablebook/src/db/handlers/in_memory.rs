//! In-memory store for development and tests.
//!
//! A session holds the store-wide lock for its whole lifetime and works on a copy of
//! the data; commit writes the copy back. Sessions are therefore fully serialized, and
//! an uncommitted session leaves no trace. A task must not open a second session while
//! it still holds one.

use crate::db::{
    errors::{DbError, Result},
    handlers::{
        repository::{ReservationRepository, Repository, TableRepository},
        store::{Session, Store},
    },
    models::{
        reservations::{
            ReservationCreateDBRequest, ReservationDBResponse, ReservationFilter, ReservationUpdateDBRequest, ReservationWithTable,
            TableSummary,
        },
        tables::{TableCreateDBRequest, TableDBResponse, TableFilter, TableUpdateDBRequest},
    },
};
use crate::types::{ReservationId, TableId};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct Snapshot {
    tables: BTreeMap<TableId, TableDBResponse>,
    reservations: BTreeMap<ReservationId, ReservationDBResponse>,
    last_table_id: TableId,
    last_reservation_id: ReservationId,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<Snapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct InMemorySession {
    guard: OwnedMutexGuard<Snapshot>,
    working: Snapshot,
}

#[async_trait]
impl Store for InMemoryStore {
    type Session = InMemorySession;

    async fn begin(&self) -> Result<InMemorySession> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(InMemorySession { guard, working })
    }
}

#[async_trait]
impl Session for InMemorySession {
    type Tables<'s> = InMemoryTables<'s>;
    type Reservations<'s> = InMemoryReservations<'s>;

    fn tables(&mut self) -> InMemoryTables<'_> {
        InMemoryTables { data: &mut self.working }
    }

    fn reservations(&mut self) -> InMemoryReservations<'_> {
        InMemoryReservations { data: &mut self.working }
    }

    async fn commit(self) -> Result<()> {
        let InMemorySession { mut guard, working } = self;
        *guard = working;
        Ok(())
    }
}

pub struct InMemoryTables<'s> {
    data: &'s mut Snapshot,
}

#[async_trait]
impl<'s> Repository for InMemoryTables<'s> {
    type CreateRequest = TableCreateDBRequest;
    type UpdateRequest = TableUpdateDBRequest;
    type Response = TableDBResponse;
    type Id = TableId;
    type Filter = TableFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        self.data.last_table_id += 1;
        let now = Utc::now();
        let table = TableDBResponse {
            id: self.data.last_table_id,
            number: request.number,
            kind: request.kind,
            status: request.status,
            created_at: now,
            updated_at: now,
        };
        self.data.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(self.data.tables.get(&id).cloned())
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(self
            .data
            .tables
            .values()
            .filter(|table| filter.status.is_none_or(|status| table.status == status))
            .cloned()
            .collect())
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let Some(table) = self.data.tables.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(number) = request.number {
            table.number = number;
        }
        if let Some(kind) = request.kind {
            table.kind = kind;
        }
        if let Some(status) = request.status {
            table.status = status;
        }
        table.updated_at = Utc::now();

        Ok(Some(table.clone()))
    }

    async fn delete(&mut self, id: Self::Id) -> Result<u64> {
        if self.data.tables.remove(&id).is_none() {
            return Ok(0);
        }

        // ON DELETE SET NULL
        for reservation in self.data.reservations.values_mut() {
            if reservation.table_id == Some(id) {
                reservation.table_id = None;
            }
        }
        Ok(1)
    }
}

#[async_trait]
impl<'s> TableRepository for InMemoryTables<'s> {
    async fn lock_by_id(&mut self, id: TableId) -> Result<Option<TableDBResponse>> {
        // The session already holds the store-wide lock
        self.get_by_id(id).await
    }
}

pub struct InMemoryReservations<'s> {
    data: &'s mut Snapshot,
}

impl InMemoryReservations<'_> {
    fn matching(&self, filter: &ReservationFilter) -> Vec<ReservationDBResponse> {
        let mut reservations: Vec<_> = self
            .data
            .reservations
            .values()
            .filter(|reservation| filter.matches(reservation))
            .cloned()
            .collect();
        reservations.sort_by_key(|reservation| (reservation.reserved_at, reservation.id));
        reservations
    }
}

#[async_trait]
impl<'s> Repository for InMemoryReservations<'s> {
    type CreateRequest = ReservationCreateDBRequest;
    type UpdateRequest = ReservationUpdateDBRequest;
    type Response = ReservationDBResponse;
    type Id = ReservationId;
    type Filter = ReservationFilter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        if !self.data.tables.contains_key(&request.table_id) {
            return Err(DbError::ForeignKeyViolation {
                constraint: Some("reservations_table_id_fkey".to_string()),
                table: Some("reservations".to_string()),
                message: format!("table {} does not exist", request.table_id),
            });
        }
        if request.party_size <= 0 {
            return Err(DbError::CheckViolation {
                constraint: Some("reservations_party_size_check".to_string()),
                table: Some("reservations".to_string()),
                message: "party_size must be positive".to_string(),
            });
        }

        self.data.last_reservation_id += 1;
        let now = Utc::now();
        let reservation = ReservationDBResponse {
            id: self.data.last_reservation_id,
            status: request.status,
            reserved_at: request.reserved_at,
            table_id: Some(request.table_id),
            customer_id: request.customer_id,
            party_size: request.party_size,
            created_at: now,
            updated_at: now,
        };
        self.data.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        Ok(self.data.reservations.get(&id).cloned())
    }

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        Ok(self.matching(filter))
    }

    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        if let Some(table_id) = request.table_id {
            if !self.data.tables.contains_key(&table_id) {
                return Err(DbError::ForeignKeyViolation {
                    constraint: Some("reservations_table_id_fkey".to_string()),
                    table: Some("reservations".to_string()),
                    message: format!("table {table_id} does not exist"),
                });
            }
        }

        let Some(reservation) = self.data.reservations.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(status) = request.status {
            reservation.status = status;
        }
        if let Some(reserved_at) = request.reserved_at {
            reservation.reserved_at = reserved_at;
        }
        if let Some(table_id) = request.table_id {
            reservation.table_id = Some(table_id);
        }
        if let Some(party_size) = request.party_size {
            reservation.party_size = party_size;
        }
        reservation.updated_at = Utc::now();

        Ok(Some(reservation.clone()))
    }

    async fn delete(&mut self, id: Self::Id) -> Result<u64> {
        Ok(self.data.reservations.remove(&id).map_or(0, |_| 1))
    }
}

#[async_trait]
impl<'s> ReservationRepository for InMemoryReservations<'s> {
    async fn list_with_table(&mut self, filter: &ReservationFilter) -> Result<Vec<ReservationWithTable>> {
        Ok(self
            .matching(filter)
            .into_iter()
            .map(|reservation| {
                let table = reservation
                    .table_id
                    .and_then(|id| self.data.tables.get(&id))
                    .map(|table| TableSummary {
                        number: table.number,
                        kind: table.kind,
                    });
                ReservationWithTable { reservation, table }
            })
            .collect())
    }
}
