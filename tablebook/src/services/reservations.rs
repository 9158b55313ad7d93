//! Booking workflow: availability, reservation lifecycle and staff listings.
//!
//! Every operation that changes a reservation and its table does so on one
//! [`Session`], so both writes commit together or not at all. Booking locks the table
//! row before checking it, which serializes concurrent attempts on the same table.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::ReservationPolicy;
use crate::db::{
    handlers::{ReservationRepository, Repository, Session, Store, TableRepository},
    models::{
        reservations::{
            ReservationCreateDBRequest, ReservationDBResponse, ReservationFilter, ReservationStatus, ReservationUpdateDBRequest,
            ReservationWithTable, TableSummary, TimeWindow,
        },
        tables::{TableDBResponse, TableFilter, TableStatus},
    },
};
use crate::errors::{Error, Result};
use crate::identity::{IdentityError, IdentityResolver};
use crate::services::tables::{StatusUpdate, TableService};
use crate::types::{CustomerId, ReservationId, TableId};

/// A validated booking request.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub table_id: TableId,
    pub reserved_at: DateTime<Utc>,
    pub party_size: i32,
}

fn to_chrono(duration: std::time::Duration, name: &str) -> Result<Duration> {
    Duration::from_std(duration).map_err(|e| Error::Internal {
        operation: format!("convert {name}: {e}"),
    })
}

fn check_party_size(party_size: i32) -> Result<()> {
    if party_size < 1 {
        return Err(Error::bad_request("Party size must be at least 1"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ReservationService<S> {
    store: S,
    identity: Arc<dyn IdentityResolver>,
    policy: ReservationPolicy,
}

impl<S: Store> ReservationService<S> {
    pub fn new(store: S, identity: Arc<dyn IdentityResolver>, policy: ReservationPolicy) -> Self {
        Self { store, identity, policy }
    }

    /// Tables that are `Available` and have no active reservation inside the slot
    /// starting at the requested hour.
    ///
    /// Party size is validated but not matched against table capacity; tables carry no
    /// capacity attribute.
    #[instrument(skip(self), err)]
    pub async fn check_availability(&self, date: NaiveDate, time: NaiveTime, party_size: i32) -> Result<Vec<TableDBResponse>> {
        check_party_size(party_size)?;

        let hour = NaiveTime::from_hms_opt(time.hour(), 0, 0).unwrap_or(time);
        let start = date.and_time(hour).and_utc();
        let window = TimeWindow::half_open(start, to_chrono(self.policy.availability_window, "availability_window")?);

        let mut session = self.store.begin().await?;
        let occupied: HashSet<TableId> = session
            .reservations()
            .list(&ReservationFilter::default().within(window))
            .await?
            .into_iter()
            // A cancelled booking frees its slot
            .filter(|reservation| reservation.status.is_active())
            .filter_map(|reservation| reservation.table_id)
            .collect();

        let tables = session
            .tables()
            .list(&TableFilter::default().with_status(TableStatus::Available))
            .await?;

        Ok(tables.into_iter().filter(|table| !occupied.contains(&table.id)).collect())
    }

    /// Book a table for a registered customer and mark the table `Reserved`.
    #[instrument(skip(self, bearer), err)]
    pub async fn reserve(&self, customer_id: CustomerId, bearer: &str, request: NewReservation) -> Result<ReservationDBResponse> {
        check_party_size(request.party_size)?;
        self.resolve_customer(customer_id, bearer).await?;

        let mut session = self.store.begin().await?;
        let table = session
            .tables()
            .lock_by_id(request.table_id)
            .await?
            .ok_or_else(|| Error::not_found("Table", request.table_id))?;
        if table.status != TableStatus::Available {
            return Err(Error::conflict(format!("Table {} is not available ({})", table.id, table.status)));
        }

        let reservation = session
            .reservations()
            .create(&ReservationCreateDBRequest {
                status: self.policy.initial_status,
                reserved_at: request.reserved_at,
                table_id: table.id,
                customer_id,
                party_size: request.party_size,
            })
            .await?;

        let outcome = TableService::<S>::set_status_internal(&mut session.tables(), table.id, TableStatus::Reserved).await;
        if outcome != StatusUpdate::Applied {
            // Dropping the session discards the reservation as well
            return Err(Error::Internal {
                operation: format!("mark table {} reserved", table.id),
            });
        }

        session.commit().await?;
        info!(reservation_id = reservation.id, table_id = table.id, customer_id, "reservation created");
        Ok(reservation)
    }

    /// Customer cancellation, subject to ownership and the cancellation window.
    pub async fn cancel(&self, id: ReservationId, customer_id: CustomerId) -> Result<ReservationDBResponse> {
        self.cancel_at(id, customer_id, Utc::now()).await
    }

    /// [`cancel`](Self::cancel) evaluated at a fixed instant.
    #[instrument(skip(self), err)]
    pub async fn cancel_at(&self, id: ReservationId, customer_id: CustomerId, now: DateTime<Utc>) -> Result<ReservationDBResponse> {
        let window = to_chrono(self.policy.cancellation_window, "cancellation_window")?;

        let mut session = self.store.begin().await?;
        let reservation = session
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Reservation", id))?;

        if reservation.customer_id != customer_id {
            return Err(Error::forbidden("You can only cancel your own reservations"));
        }
        if !reservation.status.is_active() {
            return Err(Error::conflict(format!("Reservation {id} is already {}", reservation.status)));
        }
        if reservation.reserved_at - now < window {
            return Err(Error::conflict(format!(
                "Reservations can only be cancelled at least {} hour(s) in advance",
                window.num_hours()
            )));
        }

        let cancelled = Self::cancel_in_session(&mut session, &reservation).await?;
        session.commit().await?;
        Ok(cancelled)
    }

    /// Staff cancellation. No ownership or lead-time rule.
    #[instrument(skip(self), err)]
    pub async fn cancel_by_staff(&self, id: ReservationId) -> Result<ReservationDBResponse> {
        let mut session = self.store.begin().await?;
        let reservation = session
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Reservation", id))?;

        if reservation.status == ReservationStatus::Cancelled {
            return Err(Error::conflict(format!("Reservation {id} is already cancelled")));
        }

        let cancelled = Self::cancel_in_session(&mut session, &reservation).await?;
        session.commit().await?;
        Ok(cancelled)
    }

    /// `pending -> confirmed`. Anything else is a conflict.
    #[instrument(skip(self), err)]
    pub async fn confirm(&self, id: ReservationId) -> Result<ReservationDBResponse> {
        let mut session = self.store.begin().await?;
        let reservation = session
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Reservation", id))?;

        if reservation.status != ReservationStatus::Pending {
            return Err(Error::conflict(format!(
                "Only pending reservations can be confirmed; reservation {id} is {}",
                reservation.status
            )));
        }

        let confirmed = session
            .reservations()
            .update(id, &ReservationUpdateDBRequest::status(ReservationStatus::Confirmed))
            .await?
            .ok_or_else(|| Error::not_found("Reservation", id))?;
        session.commit().await?;
        Ok(confirmed)
    }

    #[instrument(skip(self), err)]
    pub async fn history(&self, customer_id: CustomerId) -> Result<Vec<ReservationWithTable>> {
        let mut session = self.store.begin().await?;
        let reservations = session
            .reservations()
            .list_with_table(&ReservationFilter::default().for_customer(customer_id))
            .await?;
        Ok(reservations)
    }

    /// Reservations on `date` (today, UTC, when omitted), earliest first.
    #[instrument(skip(self), err)]
    pub async fn daily(&self, date: Option<NaiveDate>) -> Result<Vec<ReservationWithTable>> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let mut session = self.store.begin().await?;
        let reservations = session
            .reservations()
            .list_with_table(&ReservationFilter::default().within(TimeWindow::day(date)))
            .await?;
        Ok(reservations)
    }

    /// A customer's view of one of their reservations.
    #[instrument(skip(self), err)]
    pub async fn status(&self, id: ReservationId, customer_id: CustomerId) -> Result<ReservationWithTable> {
        let mut session = self.store.begin().await?;
        let reservation = session
            .reservations()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Reservation", id))?;

        if reservation.customer_id != customer_id {
            return Err(Error::forbidden("You can only view your own reservations"));
        }

        let table = match reservation.table_id {
            Some(table_id) => session.tables().get_by_id(table_id).await?.map(|table| TableSummary {
                number: table.number,
                kind: table.kind,
            }),
            None => None,
        };
        Ok(ReservationWithTable { reservation, table })
    }

    /// All reservations, or only those with the given status (matched case-insensitively).
    #[instrument(skip(self), err)]
    pub async fn by_status(&self, status: Option<&str>) -> Result<Vec<ReservationWithTable>> {
        let mut filter = ReservationFilter::default();
        if let Some(raw) = status {
            filter = filter.with_status(raw.parse::<ReservationStatus>().map_err(Error::bad_request)?);
        }

        let mut session = self.store.begin().await?;
        let reservations = session.reservations().list_with_table(&filter).await?;
        Ok(reservations)
    }

    async fn resolve_customer(&self, customer_id: CustomerId, bearer: &str) -> Result<()> {
        match self.identity.find_customer(customer_id, bearer).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(Error::NotFound {
                resource: "Registered customer".to_string(),
                id: customer_id.to_string(),
            }),
            Err(IdentityError::Rejected { status }) => {
                warn!(customer_id, status, "user service rejected the forwarded credential");
                Err(Error::Unauthenticated {
                    message: Some("Credential rejected by the user service".to_string()),
                })
            }
            Err(e @ IdentityError::Transport(_)) => Err(Error::Other(anyhow::Error::new(e).context("resolve customer"))),
        }
    }

    /// Cancel `reservation` and release its table, without committing.
    async fn cancel_in_session(session: &mut S::Session, reservation: &ReservationDBResponse) -> Result<ReservationDBResponse> {
        let cancelled = session
            .reservations()
            .update(reservation.id, &ReservationUpdateDBRequest::status(ReservationStatus::Cancelled))
            .await?
            .ok_or_else(|| Error::not_found("Reservation", reservation.id))?;

        if let Some(table_id) = reservation.table_id {
            let outcome = TableService::<S>::set_status_internal(&mut session.tables(), table_id, TableStatus::Available).await;
            if let StatusUpdate::Failed(_) = outcome {
                return Err(Error::Internal {
                    operation: format!("release table {table_id}"),
                });
            }
        }

        info!(reservation_id = reservation.id, "reservation cancelled");
        Ok(cancelled)
    }
}
