//! Units of work over the repositories.
//!
//! A [`Store`] hands out [`Session`]s. Both repositories obtained from one session
//! operate on the same transaction, so a reservation write and the matching table
//! status write either both land on [`Session::commit`] or neither does. Dropping a
//! session without committing discards its writes.

use crate::db::errors::{DbError, Result};
use crate::db::handlers::{
    repository::{ReservationRepository, TableRepository},
    reservations::Reservations,
    tables::Tables,
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Session: Session;

    /// Open a new unit of work.
    async fn begin(&self) -> Result<Self::Session>;
}

#[async_trait]
pub trait Session: Send + Sized {
    type Tables<'s>: TableRepository
    where
        Self: 's;

    type Reservations<'s>: ReservationRepository
    where
        Self: 's;

    fn tables(&mut self) -> Self::Tables<'_>;

    fn reservations(&mut self) -> Self::Reservations<'_>;

    /// Make every write performed through this session durable.
    async fn commit(self) -> Result<()>;
}

/// Postgres-backed store. One session is one transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl Store for PgStore {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession> {
        let tx = self.pool.begin().await?;
        Ok(PgSession { tx })
    }
}

#[async_trait]
impl Session for PgSession {
    type Tables<'s> = Tables<'s>;
    type Reservations<'s> = Reservations<'s>;

    fn tables(&mut self) -> Tables<'_> {
        Tables::new(&mut self.tx)
    }

    fn reservations(&mut self) -> Reservations<'_> {
        Reservations::new(&mut self.tx)
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(DbError::from)
    }
}
