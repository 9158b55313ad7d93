//! Raw repository endpoints under `/db`.
//!
//! Plain pass-throughs to the repositories with no business rules and no auth. Mounted
//! only when `database_api.enabled` is set.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::ApiJson,
    api::models::{
        database::{DeletedResponse, ReservationPatch, ReservationRecord, TablePatch, TableRecord},
        reservations::ReservationResponse,
        tables::TableResponse,
    },
    db::{
        handlers::{ReservationRepository, Repository, Session, Store, TableRepository},
        models::{
            reservations::{ReservationCreateDBRequest, ReservationFilter, ReservationStatus, ReservationUpdateDBRequest},
            tables::{TableCreateDBRequest, TableFilter, TableUpdateDBRequest},
        },
    },
    errors::{Error, Result},
    services::tables::parse_status,
    types::parse_id,
};

/// Ids must be positive integers.
fn positive_id(raw: &str, name: &str) -> Result<i64> {
    let id = parse_id(raw, name)?;
    if id <= 0 {
        return Err(Error::bad_request(format!("{name} must be a positive integer")));
    }
    Ok(id)
}

fn non_empty<T>(rows: Vec<T>, message: String) -> Result<Vec<T>> {
    if rows.is_empty() {
        return Err(Error::NoResults { message });
    }
    Ok(rows)
}

#[tracing::instrument(skip_all)]
pub async fn list_tables<S: Store>(State(state): State<AppState<S>>) -> Result<Json<Vec<TableResponse>>> {
    let mut session = state.store.begin().await?;
    let tables = session.tables().list(&TableFilter::default()).await?;
    Ok(Json(tables.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn get_table<S: Store>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<TableResponse>> {
    let id = positive_id(&id, "id")?;
    let mut session = state.store.begin().await?;
    let table = session.tables().get_by_id(id).await?.ok_or_else(|| Error::not_found("Table", id))?;
    Ok(Json(table.into()))
}

#[tracing::instrument(skip_all)]
pub async fn tables_by_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<TableResponse>>> {
    let parsed = parse_status(&status)?;
    let mut session = state.store.begin().await?;
    let tables = non_empty(session.tables().find_by_status(parsed).await?, format!("No tables with status {status}"))?;
    Ok(Json(tables.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn create_table<S: Store>(
    State(state): State<AppState<S>>,
    ApiJson(record): ApiJson<TableRecord>,
) -> Result<(StatusCode, Json<TableResponse>)> {
    let mut session = state.store.begin().await?;
    let table = session.tables().create(&TableCreateDBRequest::from(record)).await?;
    session.commit().await?;
    Ok((StatusCode::CREATED, Json(table.into())))
}

#[tracing::instrument(skip_all)]
pub async fn update_table<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TablePatch>,
) -> Result<Json<TableResponse>> {
    let id = positive_id(&id, "id")?;
    let mut session = state.store.begin().await?;
    let table = session
        .tables()
        .update(id, &TableUpdateDBRequest::from(patch))
        .await?
        .ok_or_else(|| Error::not_found("Table", id))?;
    session.commit().await?;
    Ok(Json(table.into()))
}

#[tracing::instrument(skip_all)]
pub async fn delete_table<S: Store>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<DeletedResponse>> {
    let id = positive_id(&id, "id")?;
    let mut session = state.store.begin().await?;
    let deleted = session.tables().delete(id).await?;
    if deleted == 0 {
        return Err(Error::not_found("Table", id));
    }
    session.commit().await?;
    Ok(Json(DeletedResponse { deleted }))
}

#[tracing::instrument(skip_all)]
pub async fn list_reservations<S: Store>(State(state): State<AppState<S>>) -> Result<Json<Vec<ReservationResponse>>> {
    let mut session = state.store.begin().await?;
    let reservations = session.reservations().list(&ReservationFilter::default()).await?;
    Ok(Json(reservations.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn get_reservation<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>> {
    let id = positive_id(&id, "id")?;
    let mut session = state.store.begin().await?;
    let reservation = session
        .reservations()
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found("Reservation", id))?;
    Ok(Json(reservation.into()))
}

#[tracing::instrument(skip_all)]
pub async fn reservations_by_customer<S: Store>(
    State(state): State<AppState<S>>,
    Path(customer_id): Path<String>,
) -> Result<Json<Vec<ReservationResponse>>> {
    let customer_id = positive_id(&customer_id, "customer id")?;
    let mut session = state.store.begin().await?;
    let rows = non_empty(
        session.reservations().find_by_customer(customer_id).await?,
        format!("No reservations for customer {customer_id}"),
    )?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn reservations_by_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<ReservationResponse>>> {
    let parsed = status.parse::<ReservationStatus>().map_err(Error::bad_request)?;
    let mut session = state.store.begin().await?;
    let rows = non_empty(session.reservations().find_by_status(parsed).await?, format!("No reservations with status {status}"))?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[tracing::instrument(skip_all)]
pub async fn create_reservation<S: Store>(
    State(state): State<AppState<S>>,
    ApiJson(record): ApiJson<ReservationRecord>,
) -> Result<(StatusCode, Json<ReservationResponse>)> {
    let mut session = state.store.begin().await?;
    let reservation = session.reservations().create(&ReservationCreateDBRequest::from(record)).await?;
    session.commit().await?;
    Ok((StatusCode::CREATED, Json(reservation.into())))
}

#[tracing::instrument(skip_all)]
pub async fn update_reservation<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ReservationPatch>,
) -> Result<Json<ReservationResponse>> {
    let id = positive_id(&id, "id")?;
    let mut session = state.store.begin().await?;
    let reservation = session
        .reservations()
        .update(id, &ReservationUpdateDBRequest::from(patch))
        .await?
        .ok_or_else(|| Error::not_found("Reservation", id))?;
    session.commit().await?;
    Ok(Json(reservation.into()))
}

#[tracing::instrument(skip_all)]
pub async fn delete_reservation<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>> {
    let id = positive_id(&id, "id")?;
    let mut session = state.store.begin().await?;
    let deleted = session.reservations().delete(id).await?;
    if deleted == 0 {
        return Err(Error::not_found("Reservation", id));
    }
    session.commit().await?;
    Ok(Json(DeletedResponse { deleted }))
}
