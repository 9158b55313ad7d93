//! API request/response models for reservations.
//!
//! Query and body field names follow the external contract (`fecha`, `hora`,
//! `cantidadPersonas`, `idMesa`, `fechaReserva`, `estado`); response bodies use English
//! snake_case.

use crate::api::models::tables::TableResponse;
use crate::db::models::reservations::{ReservationDBResponse, ReservationStatus, ReservationWithTable};
use crate::db::models::tables::{TableDBResponse, TableKind};
use crate::errors::{Error, Result};
use crate::services::NewReservation;
use crate::types::{CustomerId, ReservationId, TableId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `pattern` uses `d` for "any ASCII digit"; every other character must match exactly.
fn has_shape(value: &str, pattern: &str) -> bool {
    value.len() == pattern.len()
        && value
            .bytes()
            .zip(pattern.bytes())
            .all(|(v, p)| if p == b'd' { v.is_ascii_digit() } else { v == p })
}

/// Parse a `YYYY-MM-DD` date, naming the parameter in the 400 message.
pub fn parse_date(raw: &str, name: &str) -> Result<NaiveDate> {
    if !has_shape(raw, "dddd-dd-dd") {
        return Err(Error::bad_request(format!("{name} must use the format YYYY-MM-DD")));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| Error::bad_request(format!("{name} is not a valid date")))
}

/// Parse an `HH:mm` time, naming the parameter in the 400 message.
pub fn parse_time(raw: &str, name: &str) -> Result<NaiveTime> {
    if !has_shape(raw, "dd:dd") {
        return Err(Error::bad_request(format!("{name} must use the format HH:mm")));
    }
    NaiveTime::parse_from_str(raw, "%H:%M").map_err(|_| Error::bad_request(format!("{name} is not a valid time")))
}

/// Accepts a JSON integer or a string holding one.
fn integer_field(value: Option<&Value>, name: &str) -> Result<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::bad_request(format!("{name} must be an integer"))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::bad_request(format!("{name} must be an integer"))),
        Some(_) => Err(Error::bad_request(format!("{name} must be an integer"))),
    }
}

/// RFC 3339, or a bare `YYYY-MM-DDTHH:MM[:SS]` taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::bad_request("fechaReserva must be an ISO 8601 date-time"))
}

/// `GET /availability` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub fecha: Option<String>,
    pub hora: Option<String>,
    #[serde(rename = "cantidadPersonas")]
    pub party_size: Option<String>,
}

impl AvailabilityQuery {
    pub fn parse(&self) -> Result<(NaiveDate, NaiveTime, i32)> {
        let (Some(fecha), Some(hora), Some(party_size)) = (
            self.fecha.as_deref().filter(|s| !s.is_empty()),
            self.hora.as_deref().filter(|s| !s.is_empty()),
            self.party_size.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(Error::bad_request("fecha, hora and cantidadPersonas are required"));
        };

        let date = parse_date(fecha, "fecha")?;
        let time = parse_time(hora, "hora")?;
        let party_size = party_size
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::bad_request("cantidadPersonas must be an integer"))?;
        Ok((date, time, party_size))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub date: NaiveDate,
    pub time: String,
    pub party_size: i32,
    pub total: usize,
    pub tables: Vec<TableResponse>,
}

impl AvailabilityResponse {
    pub fn new(date: NaiveDate, time: NaiveTime, party_size: i32, tables: Vec<TableDBResponse>) -> Self {
        Self {
            message: tables
                .is_empty()
                .then(|| "No tables are available for the requested time".to_string()),
            date,
            time: time.format("%H:%M").to_string(),
            party_size,
            total: tables.len(),
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }
}

/// `POST /reserve` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReserveRequest {
    #[serde(rename = "idMesa")]
    pub table_id: Option<Value>,
    #[serde(rename = "fechaReserva")]
    pub reserved_at: Option<String>,
    #[serde(rename = "cantidadPersonas")]
    pub party_size: Option<Value>,
}

impl TryFrom<ReserveRequest> for NewReservation {
    type Error = Error;

    fn try_from(request: ReserveRequest) -> Result<Self> {
        let table_id = integer_field(request.table_id.as_ref(), "idMesa")?;
        let party_size = integer_field(request.party_size.as_ref(), "cantidadPersonas")?;
        let reserved_at = request.reserved_at.as_deref().filter(|s| !s.trim().is_empty());

        let (Some(table_id), Some(reserved_at), Some(party_size)) = (table_id, reserved_at, party_size) else {
            return Err(Error::bad_request("idMesa, fechaReserva and cantidadPersonas are required"));
        };

        Ok(NewReservation {
            table_id,
            reserved_at: parse_timestamp(reserved_at.trim())?,
            party_size: i32::try_from(party_size).map_err(|_| Error::bad_request("cantidadPersonas is out of range"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: ReservationId,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    pub table_id: Option<TableId>,
    pub customer_id: CustomerId,
    pub party_size: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReservationDBResponse> for ReservationResponse {
    fn from(db: ReservationDBResponse) -> Self {
        Self {
            id: db.id,
            status: db.status,
            reserved_at: db.reserved_at,
            table_id: db.table_id,
            customer_id: db.customer_id,
            party_size: db.party_size,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

/// Result of a reservation state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationActionResponse {
    pub message: String,
    pub reservation: ReservationResponse,
}

impl ReservationActionResponse {
    pub fn new(message: impl Into<String>, reservation: ReservationDBResponse) -> Self {
        Self {
            message: message.into(),
            reservation: reservation.into(),
        }
    }
}

/// A reservation as shown in listings and status lookups, with its table resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDetails {
    pub id: ReservationId,
    pub status: ReservationStatus,
    pub reserved_at: DateTime<Utc>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub time: String,
    pub table_id: Option<TableId>,
    /// `-` when the table no longer exists
    pub table_number: String,
    /// `Unknown` when the table no longer exists
    pub table_type: String,
    pub customer_id: CustomerId,
    pub party_size: i32,
}

impl From<ReservationWithTable> for ReservationDetails {
    fn from(row: ReservationWithTable) -> Self {
        let ReservationWithTable { reservation, table } = row;
        Self {
            id: reservation.id,
            status: reservation.status,
            reserved_at: reservation.reserved_at,
            date: reservation.reserved_at.format("%Y-%m-%d").to_string(),
            time: reservation.reserved_at.format("%H:%M").to_string(),
            table_id: reservation.table_id,
            table_number: table.map_or_else(|| "-".to_string(), |t| t.number.to_string()),
            table_type: table.map_or_else(|| "Unknown".to_string(), |t| TableKind::as_str(t.kind).to_string()),
            customer_id: reservation.customer_id,
            party_size: reservation.party_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationListResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub total: usize,
    pub reservations: Vec<ReservationDetails>,
}

impl ReservationListResponse {
    pub fn new(rows: Vec<ReservationWithTable>, empty_message: impl Into<String>) -> Self {
        Self {
            message: rows.is_empty().then(|| empty_message.into()),
            total: rows.len(),
            reservations: rows.into_iter().map(Into::into).collect(),
        }
    }
}

/// `GET /daily` query. An absent or empty `fecha` means today.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyQuery {
    pub fecha: Option<String>,
}

impl DailyQuery {
    pub fn date(&self) -> Result<Option<NaiveDate>> {
        self.fecha
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|raw| parse_date(raw, "fecha"))
            .transpose()
    }
}

/// `GET /staff/status` query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusQuery {
    pub estado: Option<String>,
}
