//! Database repository for reservations.

use crate::db::{
    errors::Result,
    handlers::repository::{ReservationRepository, Repository},
    models::{
        reservations::{
            ReservationCreateDBRequest, ReservationDBResponse, ReservationFilter, ReservationUpdateDBRequest, ReservationWithTable,
            TableSummary,
        },
        tables::TableKind,
    },
};
use crate::types::ReservationId;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use std::ops::Bound;
use tracing::instrument;

// Row shape of the reservation/table LEFT JOIN
#[derive(Debug, FromRow)]
struct ReservationTableRow {
    #[sqlx(flatten)]
    reservation: ReservationDBResponse,
    table_number: Option<i32>,
    table_type: Option<TableKind>,
}

impl From<ReservationTableRow> for ReservationWithTable {
    fn from(row: ReservationTableRow) -> Self {
        let table = match (row.table_number, row.table_type) {
            (Some(number), Some(kind)) => Some(TableSummary { number, kind }),
            _ => None,
        };
        Self {
            reservation: row.reservation,
            table,
        }
    }
}

/// Append the filter's predicates and ordering. `prefix` qualifies column names
/// (e.g. `"r."`) when the reservations table is aliased.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ReservationFilter, prefix: &str) {
    if let Some(customer_id) = filter.customer_id {
        query.push(format!(" AND {prefix}customer_id = "));
        query.push_bind(customer_id);
    }

    if let Some(status) = filter.status {
        query.push(format!(" AND {prefix}status = "));
        query.push_bind(status);
    }

    if let Some(table_id) = filter.table_id {
        query.push(format!(" AND {prefix}table_id = "));
        query.push_bind(table_id);
    }

    if let Some(window) = filter.window {
        query.push(format!(" AND {prefix}reserved_at >= "));
        query.push_bind(window.start);
        match window.end {
            Bound::Included(end) => {
                query.push(format!(" AND {prefix}reserved_at <= "));
                query.push_bind(end);
            }
            Bound::Excluded(end) => {
                query.push(format!(" AND {prefix}reserved_at < "));
                query.push_bind(end);
            }
            Bound::Unbounded => {}
        }
    }

    query.push(format!(" ORDER BY {prefix}reserved_at ASC, {prefix}id ASC"));
}

pub struct Reservations<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Reservations<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Reservations<'c> {
    type CreateRequest = ReservationCreateDBRequest;
    type UpdateRequest = ReservationUpdateDBRequest;
    type Response = ReservationDBResponse;
    type Id = ReservationId;
    type Filter = ReservationFilter;

    #[instrument(skip(self, request), fields(table_id = request.table_id, customer_id = request.customer_id), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            r#"
            INSERT INTO reservations (status, reserved_at, table_id, customer_id, party_size)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(request.status)
        .bind(request.reserved_at)
        .bind(request.table_id)
        .bind(request.customer_id)
        .bind(request.party_size)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(reservation)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(reservation)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM reservations WHERE 1=1");
        push_filter(&mut query, filter, "");

        let reservations = query
            .build_query_as::<ReservationDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;
        Ok(reservations)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let reservation = sqlx::query_as::<_, ReservationDBResponse>(
            r#"
            UPDATE reservations SET
                status = COALESCE($2, status),
                reserved_at = COALESCE($3, reserved_at),
                table_id = COALESCE($4, table_id),
                party_size = COALESCE($5, party_size),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(request.reserved_at)
        .bind(request.table_id)
        .bind(request.party_size)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(reservation)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<u64> {
        let result = sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl<'c> ReservationRepository for Reservations<'c> {
    #[instrument(skip(self, filter), err)]
    async fn list_with_table(&mut self, filter: &ReservationFilter) -> Result<Vec<ReservationWithTable>> {
        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT r.*, t.number AS table_number, t.table_type AS table_type
            FROM reservations r
            LEFT JOIN dining_tables t ON t.id = r.table_id
            WHERE 1=1
            "#,
        );
        push_filter(&mut query, filter, "r.");

        let rows = query.build_query_as::<ReservationTableRow>().fetch_all(&mut *self.db).await?;
        Ok(rows.into_iter().map(ReservationWithTable::from).collect())
    }
}
