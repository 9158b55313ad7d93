//! Table queries and status transitions.

use tracing::{instrument, warn};

use crate::api::models::tables::{TableCreate, TableUpdate};
use crate::db::{
    handlers::{Repository, Session, Store, TableRepository},
    models::{
        reservations::ReservationFilter,
        tables::{TableCreateDBRequest, TableDBResponse, TableFilter, TableKind, TableStatus, TableUpdateDBRequest},
    },
};
use crate::errors::{Error, Result};
use crate::types::TableId;

/// Outcome of [`TableService::set_status_internal`]. Never an error: the caller decides
/// whether a miss is worth escalating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Applied,
    NotFound,
    Failed(String),
}

/// Result of a staff status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub table: TableDBResponse,
    /// `false` when the table already had the requested status and nothing was written
    pub changed: bool,
}

pub(crate) fn parse_status(raw: &str) -> Result<TableStatus> {
    raw.parse::<TableStatus>().map_err(Error::bad_request)
}

pub(crate) fn parse_kind(raw: &str) -> Result<TableKind> {
    raw.parse::<TableKind>().map_err(Error::bad_request)
}

#[derive(Clone)]
pub struct TableService<S> {
    store: S,
}

impl<S: Store> TableService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), err)]
    pub async fn list_all(&self) -> Result<Vec<TableDBResponse>> {
        let mut session = self.store.begin().await?;
        let tables = session.tables().list(&TableFilter::default()).await?;
        Ok(tables)
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, id: TableId) -> Result<TableDBResponse> {
        let mut session = self.store.begin().await?;
        let table = session.tables().get_by_id(id).await?;
        table.ok_or_else(|| Error::not_found("Table", id))
    }

    #[instrument(skip(self, request), err)]
    pub async fn create(&self, request: TableCreate) -> Result<TableDBResponse> {
        let (Some(number), Some(kind), Some(status)) = (request.number, request.kind.as_deref(), request.status.as_deref()) else {
            return Err(Error::bad_request("number, type and status are required"));
        };

        let request = TableCreateDBRequest {
            number,
            kind: parse_kind(kind)?,
            status: parse_status(status)?,
        };

        let mut session = self.store.begin().await?;
        let table = session.tables().create(&request).await?;
        session.commit().await?;
        Ok(table)
    }

    /// Merge the supplied fields into an existing table.
    #[instrument(skip(self, request), err)]
    pub async fn update(&self, id: TableId, request: TableUpdate) -> Result<TableDBResponse> {
        let mut session = self.store.begin().await?;
        let existing = session
            .tables()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Table", id))?;

        let update = TableUpdateDBRequest {
            number: request.number,
            kind: request.kind.as_deref().map(parse_kind).transpose()?,
            status: request.status.as_deref().map(parse_status).transpose()?,
        };
        if update.is_empty() {
            return Ok(existing);
        }

        let table = session
            .tables()
            .update(id, &update)
            .await?
            .ok_or_else(|| Error::not_found("Table", id))?;
        session.commit().await?;
        Ok(table)
    }

    /// Staff status change. Setting the current status again is a no-op.
    #[instrument(skip(self), err)]
    pub async fn update_status(&self, id: TableId, status: Option<&str>) -> Result<StatusChange> {
        let mut session = self.store.begin().await?;
        let existing = session
            .tables()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Table", id))?;

        let status = parse_status(status.ok_or_else(|| Error::bad_request("status is required"))?)?;
        if existing.status == status {
            return Ok(StatusChange {
                table: existing,
                changed: false,
            });
        }

        let table = session
            .tables()
            .update(id, &TableUpdateDBRequest::status(status))
            .await?
            .ok_or_else(|| Error::not_found("Table", id))?;
        session.commit().await?;
        Ok(StatusChange { table, changed: true })
    }

    /// Remove a table. Refused while a pending or confirmed reservation still holds it.
    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: TableId) -> Result<()> {
        let mut session = self.store.begin().await?;
        if session.tables().get_by_id(id).await?.is_none() {
            return Err(Error::not_found("Table", id));
        }

        let holding = session
            .reservations()
            .list(&ReservationFilter::default().for_table(id))
            .await?
            .into_iter()
            .filter(|reservation| reservation.status.is_active())
            .count();
        if holding > 0 {
            return Err(Error::conflict(format!("Table {id} has {holding} active reservation(s)")));
        }

        if session.tables().delete(id).await? == 0 {
            return Err(Error::not_found("Table", id));
        }
        session.commit().await?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn list_by_status(&self, status: &str) -> Result<Vec<TableDBResponse>> {
        let status = parse_status(status)?;
        let mut session = self.store.begin().await?;
        let tables = session.tables().find_by_status(status).await?;
        Ok(tables)
    }

    /// Best-effort status write used as a side effect of reservation changes. Runs on
    /// the caller's session so it commits or rolls back together with the caller's writes.
    pub async fn set_status_internal<R>(tables: &mut R, id: TableId, status: TableStatus) -> StatusUpdate
    where
        R: TableRepository + ?Sized,
    {
        match tables.update(id, &TableUpdateDBRequest::status(status)).await {
            Ok(Some(_)) => StatusUpdate::Applied,
            Ok(None) => {
                warn!(table_id = id, %status, "table not found while setting status");
                StatusUpdate::NotFound
            }
            Err(e) => {
                warn!(table_id = id, %status, error = %e, "failed to set table status");
                StatusUpdate::Failed(e.to_string())
            }
        }
    }
}
