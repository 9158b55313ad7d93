//! Base repository trait and its per-entity specializations.

use crate::db::errors::Result;
use crate::db::models::{
    reservations::{
        ReservationCreateDBRequest, ReservationDBResponse, ReservationFilter, ReservationStatus, ReservationUpdateDBRequest,
        ReservationWithTable,
    },
    tables::{TableCreateDBRequest, TableDBResponse, TableFilter, TableStatus, TableUpdateDBRequest},
};
use crate::types::{CustomerId, ReservationId, TableId};

/// Base repository trait providing common database operations
///
/// A repository is the data access layer for one entity. Implementations borrow a
/// [`Session`](super::store::Session), so every call made through one repository value
/// shares that session's transaction.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest: Sync;

    /// The request type for updating entities
    type UpdateRequest: Sync;

    /// The response/DTO type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync + Copy;

    /// The filter type for list operations
    type Filter: Send + Sync;

    /// Create a new entity
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List entities matching the filter
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Update the supplied fields of an entity, returning the new row or `None` if it doesn't exist
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>>;

    /// Delete an entity by ID, returning the number of rows removed
    async fn delete(&mut self, id: Self::Id) -> Result<u64>;
}

#[async_trait::async_trait]
pub trait TableRepository:
    Repository<
        CreateRequest = TableCreateDBRequest,
        UpdateRequest = TableUpdateDBRequest,
        Response = TableDBResponse,
        Id = TableId,
        Filter = TableFilter,
    > + Send
{
    async fn find_by_status(&mut self, status: TableStatus) -> Result<Vec<TableDBResponse>> {
        self.list(&TableFilter::default().with_status(status)).await
    }

    /// Read a table and hold it against concurrent writers until the session ends.
    async fn lock_by_id(&mut self, id: TableId) -> Result<Option<TableDBResponse>>;
}

#[async_trait::async_trait]
pub trait ReservationRepository:
    Repository<
        CreateRequest = ReservationCreateDBRequest,
        UpdateRequest = ReservationUpdateDBRequest,
        Response = ReservationDBResponse,
        Id = ReservationId,
        Filter = ReservationFilter,
    > + Send
{
    async fn find_by_customer(&mut self, customer_id: CustomerId) -> Result<Vec<ReservationDBResponse>> {
        self.list(&ReservationFilter::default().for_customer(customer_id)).await
    }

    async fn find_by_status(&mut self, status: ReservationStatus) -> Result<Vec<ReservationDBResponse>> {
        self.list(&ReservationFilter::default().with_status(status)).await
    }

    /// Like [`Repository::list`], with each row eager-loaded with its table's number and type.
    async fn list_with_table(&mut self, filter: &ReservationFilter) -> Result<Vec<ReservationWithTable>>;
}
