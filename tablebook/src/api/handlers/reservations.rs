//! HTTP handlers for `/api/reservations`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    api::ApiJson,
    api::models::reservations::{
        AvailabilityQuery, AvailabilityResponse, DailyQuery, ReservationActionResponse, ReservationDetails, ReservationListResponse,
        ReserveRequest, StatusQuery,
    },
    auth::CurrentUser,
    db::handlers::Store,
    errors::Result,
    services::NewReservation,
    types::parse_id,
};

#[tracing::instrument(skip_all)]
pub async fn check_availability<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>> {
    let (date, time, party_size) = query.parse()?;
    let tables = state.reservations.check_availability(date, time, party_size).await?;
    Ok(Json(AvailabilityResponse::new(date, time, party_size, tables)))
}

#[tracing::instrument(skip_all)]
pub async fn reserve_table<S: Store>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<ReserveRequest>,
) -> Result<(StatusCode, Json<ReservationActionResponse>)> {
    current_user.require_customer()?;
    let booking = NewReservation::try_from(request)?;
    let reservation = state.reservations.reserve(current_user.id, &current_user.token, booking).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReservationActionResponse::new("Reservation created", reservation)),
    ))
}

#[tracing::instrument(skip_all)]
pub async fn reservation_history<S: Store>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
) -> Result<Json<ReservationListResponse>> {
    current_user.require_customer()?;
    let rows = state.reservations.history(current_user.id).await?;
    Ok(Json(ReservationListResponse::new(rows, "You have no reservations yet")))
}

#[tracing::instrument(skip_all)]
pub async fn daily_reservations<S: Store>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Query(query): Query<DailyQuery>,
) -> Result<Json<ReservationListResponse>> {
    current_user.require_staff()?;
    let rows = state.reservations.daily(query.date()?).await?;
    Ok(Json(ReservationListResponse::new(rows, "No reservations for this day")))
}

#[tracing::instrument(skip_all)]
pub async fn reservations_by_status<S: Store>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ReservationListResponse>> {
    current_user.require_staff()?;
    let estado = query.estado.as_deref().filter(|s| !s.is_empty());
    let rows = state.reservations.by_status(estado).await?;
    let empty = match estado {
        Some(status) => format!("No reservations with status {status}"),
        None => "No reservations found".to_string(),
    };
    Ok(Json(ReservationListResponse::new(rows, empty)))
}

#[tracing::instrument(skip_all)]
pub async fn reservation_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
) -> Result<Json<ReservationDetails>> {
    current_user.require_customer()?;
    let id = parse_id(&id, "id")?;
    let row = state.reservations.status(id, current_user.id).await?;
    Ok(Json(row.into()))
}

#[tracing::instrument(skip_all)]
pub async fn cancel_reservation<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
) -> Result<Json<ReservationActionResponse>> {
    current_user.require_customer()?;
    let id = parse_id(&id, "id")?;
    let reservation = state.reservations.cancel(id, current_user.id).await?;
    Ok(Json(ReservationActionResponse::new("Reservation cancelled", reservation)))
}

#[tracing::instrument(skip_all)]
pub async fn confirm_reservation<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
) -> Result<Json<ReservationActionResponse>> {
    current_user.require_staff()?;
    let id = parse_id(&id, "id")?;
    let reservation = state.reservations.confirm(id).await?;
    Ok(Json(ReservationActionResponse::new("Reservation confirmed", reservation)))
}

#[tracing::instrument(skip_all)]
pub async fn cancel_reservation_by_staff<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
) -> Result<Json<ReservationActionResponse>> {
    current_user.require_staff()?;
    let id = parse_id(&id, "id")?;
    let reservation = state.reservations.cancel_by_staff(id).await?;
    Ok(Json(ReservationActionResponse::new("Reservation cancelled by staff", reservation)))
}
