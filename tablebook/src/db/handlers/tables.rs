//! Database repository for dining tables.

use crate::db::{
    errors::Result,
    handlers::repository::{Repository, TableRepository},
    models::tables::{TableCreateDBRequest, TableDBResponse, TableFilter, TableUpdateDBRequest},
};
use crate::types::TableId;
use sqlx::{PgConnection, Postgres, QueryBuilder};
use tracing::instrument;

pub struct Tables<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tables<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Tables<'c> {
    type CreateRequest = TableCreateDBRequest;
    type UpdateRequest = TableUpdateDBRequest;
    type Response = TableDBResponse;
    type Id = TableId;
    type Filter = TableFilter;

    #[instrument(skip(self, request), fields(number = request.number, kind = %request.kind), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let table = sqlx::query_as::<_, TableDBResponse>(
            r#"
            INSERT INTO dining_tables (number, table_type, status)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(request.number)
        .bind(request.kind)
        .bind(request.status)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(table)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let table = sqlx::query_as::<_, TableDBResponse>("SELECT * FROM dining_tables WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(table)
    }

    #[instrument(skip(self, filter), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM dining_tables WHERE 1=1");

        if let Some(status) = filter.status {
            query.push(" AND status = ");
            query.push_bind(status);
        }

        query.push(" ORDER BY id ASC");

        let tables = query.build_query_as::<TableDBResponse>().fetch_all(&mut *self.db).await?;
        Ok(tables)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let table = sqlx::query_as::<_, TableDBResponse>(
            r#"
            UPDATE dining_tables SET
                number = COALESCE($2, number),
                table_type = COALESCE($3, table_type),
                status = COALESCE($4, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.number)
        .bind(request.kind)
        .bind(request.status)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(table)
    }

    #[instrument(skip(self), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<u64> {
        let result = sqlx::query("DELETE FROM dining_tables WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl<'c> TableRepository for Tables<'c> {
    #[instrument(skip(self), err)]
    async fn lock_by_id(&mut self, id: TableId) -> Result<Option<TableDBResponse>> {
        let table = sqlx::query_as::<_, TableDBResponse>("SELECT * FROM dining_tables WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(table)
    }
}
