//! Database models for reservations.

use crate::db::models::tables::TableKind;
use crate::types::{CustomerId, ReservationId, TableId};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Bound, str::FromStr};

/// Reservation lifecycle. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 3] = [
        ReservationStatus::Pending,
        ReservationStatus::Confirmed,
        ReservationStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the reservation still holds its table.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive: `Confirmed`, `CONFIRMED` and `confirmed` all parse.
impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == lowered)
            .ok_or_else(|| format!("Invalid reservation status '{s}'. Allowed values: pending, confirmed, cancelled"))
    }
}

/// Database response for a reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReservationDBResponse {
    pub id: ReservationId,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    /// Cleared when the table is removed; history keeps the reservation
    pub table_id: Option<TableId>,
    pub customer_id: CustomerId,
    pub party_size: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database request for creating a reservation
#[derive(Debug, Clone)]
pub struct ReservationCreateDBRequest {
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub table_id: TableId,
    pub customer_id: CustomerId,
    pub party_size: i32,
}

/// Database request for updating a reservation. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ReservationUpdateDBRequest {
    pub status: Option<ReservationStatus>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub table_id: Option<TableId>,
    pub party_size: Option<i32>,
}

impl ReservationUpdateDBRequest {
    pub fn status(status: ReservationStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// A span of reservation timestamps: inclusive start, included or excluded end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: Bound<DateTime<Utc>>,
}

impl TimeWindow {
    /// `[start, start + length)`
    pub fn half_open(start: DateTime<Utc>, length: Duration) -> Self {
        Self {
            start,
            end: Bound::Excluded(start + length),
        }
    }

    /// `[date 00:00:00Z, date 23:59:59Z]`
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = date.and_hms_opt(23, 59, 59).unwrap_or_default().and_utc();
        Self {
            start,
            end: Bound::Included(end),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if ts < self.start {
            return false;
        }
        match self.end {
            Bound::Included(end) => ts <= end,
            Bound::Excluded(end) => ts < end,
            Bound::Unbounded => true,
        }
    }
}

/// Filter for listing reservations. Results are ordered by timestamp, then id.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub customer_id: Option<CustomerId>,
    pub status: Option<ReservationStatus>,
    pub table_id: Option<TableId>,
    pub window: Option<TimeWindow>,
}

impl ReservationFilter {
    pub fn for_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn with_status(mut self, status: ReservationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn for_table(mut self, table_id: TableId) -> Self {
        self.table_id = Some(table_id);
        self
    }

    pub fn within(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn matches(&self, reservation: &ReservationDBResponse) -> bool {
        self.customer_id.is_none_or(|id| reservation.customer_id == id)
            && self.status.is_none_or(|status| reservation.status == status)
            && self.table_id.is_none_or(|id| reservation.table_id == Some(id))
            && self.window.is_none_or(|window| window.contains(reservation.reserved_at))
    }
}

/// Number and type of the table a reservation points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub number: i32,
    pub kind: TableKind,
}

/// A reservation eager-loaded with its table. `table` is `None` when the table no
/// longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationWithTable {
    pub reservation: ReservationDBResponse,
    pub table: Option<TableSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("Confirmed".parse::<ReservationStatus>().unwrap(), ReservationStatus::Confirmed);
        assert_eq!("CANCELLED".parse::<ReservationStatus>().unwrap(), ReservationStatus::Cancelled);
        assert!("done".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn test_half_open_window_excludes_end() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 18, 0, 0).unwrap();
        let window = TimeWindow::half_open(start, Duration::hours(1));

        assert!(window.contains(start));
        assert!(window.contains(start + Duration::minutes(59)));
        assert!(!window.contains(start + Duration::hours(1)));
        assert!(!window.contains(start - Duration::seconds(1)));
    }

    #[test]
    fn test_day_window_is_inclusive_to_last_second() {
        let window = TimeWindow::day(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());

        assert!(window.contains(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()));
        assert!(!window.contains(Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap()));
    }
}
