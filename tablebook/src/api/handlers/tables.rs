//! HTTP handlers for `/api/tables`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::{
    AppState,
    api::ApiJson,
    api::models::tables::{TableCreate, TableListResponse, TableResponse, TableStatusChangeResponse, TableStatusUpdate, TableUpdate},
    auth::CurrentUser,
    db::handlers::Store,
    errors::Result,
    types::parse_id,
};

#[tracing::instrument(skip_all)]
pub async fn list_tables<S: Store>(State(state): State<AppState<S>>) -> Result<Json<TableListResponse>> {
    let tables = state.tables.list_all().await?;
    Ok(Json(TableListResponse::new(tables, "No tables have been registered yet")))
}

#[tracing::instrument(skip_all)]
pub async fn get_table<S: Store>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<TableResponse>> {
    let id = parse_id(&id, "id")?;
    Ok(Json(state.tables.get(id).await?.into()))
}

#[tracing::instrument(skip_all)]
pub async fn list_tables_by_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(status): Path<String>,
) -> Result<Json<TableListResponse>> {
    let tables = state.tables.list_by_status(&status).await?;
    Ok(Json(TableListResponse::new(tables, format!("No tables with status {status}"))))
}

#[tracing::instrument(skip_all)]
pub async fn create_table<S: Store>(
    State(state): State<AppState<S>>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<TableCreate>,
) -> Result<(StatusCode, Json<TableResponse>)> {
    current_user.require_admin()?;
    let table = state.tables.create(request).await?;
    Ok((StatusCode::CREATED, Json(table.into())))
}

#[tracing::instrument(skip_all)]
pub async fn update_table<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<TableUpdate>,
) -> Result<Json<TableResponse>> {
    current_user.require_admin()?;
    let id = parse_id(&id, "id")?;
    Ok(Json(state.tables.update(id, request).await?.into()))
}

#[tracing::instrument(skip_all)]
pub async fn update_table_status<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
    ApiJson(request): ApiJson<TableStatusUpdate>,
) -> Result<Json<TableStatusChangeResponse>> {
    current_user.require_staff()?;
    let id = parse_id(&id, "id")?;
    let change = state.tables.update_status(id, request.status.as_deref()).await?;
    Ok(Json(change.into()))
}

#[tracing::instrument(skip_all)]
pub async fn delete_table<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
    current_user: CurrentUser,
) -> Result<Json<Value>> {
    current_user.require_admin()?;
    let id = parse_id(&id, "id")?;
    state.tables.delete(id).await?;
    Ok(Json(json!({ "message": format!("Table {id} deleted") })))
}

#[cfg(test)]
mod tests {
    use crate::api::models::tables::{TableListResponse, TableResponse, TableStatusChangeResponse};
    use crate::db::models::reservations::ReservationStatus;
    use crate::db::models::tables::{TableKind, TableStatus};
    use crate::test_utils::*;
    use crate::types::Role;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test_log::test(tokio::test)]
    async fn test_public_reads() {
        let app = create_test_app().await;

        let response = app.server.get("/api/tables").await;
        response.assert_status_ok();
        let empty: TableListResponse = response.json();
        assert_eq!(empty.total, 0);
        assert!(empty.message.is_some());

        let table = seed_table(&app.store, 5, TableKind::Vip, TableStatus::Available).await;

        let response = app.server.get(&format!("/api/tables/{}", table.id)).await;
        response.assert_status_ok();
        let fetched: TableResponse = response.json();
        assert_eq!(fetched.number, 5);
        assert_eq!(response.json::<serde_json::Value>()["type"], "VIP");

        app.server.get("/api/tables/abc").await.assert_status(StatusCode::BAD_REQUEST);
        app.server.get("/api/tables/999").await.assert_status(StatusCode::NOT_FOUND);

        let response = app.server.get("/api/tables/status/Available").await;
        response.assert_status_ok();
        assert_eq!(response.json::<TableListResponse>().total, 1);

        app.server
            .get("/api/tables/status/Broken")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let app = create_test_app().await;
        let body = json!({"number": 1, "type": "Regular", "status": "Available"});

        app.server.post("/api/tables").json(&body).await.assert_status(StatusCode::UNAUTHORIZED);

        let (name, value) = auth_header(&app, 10, Role::Employee);
        app.server
            .post("/api/tables")
            .add_header(name, value)
            .json(&body)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let (name, value) = auth_header(&app, 1, Role::Administrator);
        let response = app.server.post("/api/tables").add_header(name, value).json(&body).await;
        response.assert_status(StatusCode::CREATED);
        let created: TableResponse = response.json();
        assert_eq!(created.kind, TableKind::Regular);
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let app = create_test_app().await;
        let (name, value) = auth_header(&app, 1, Role::Administrator);

        let response = app
            .server
            .post("/api/tables")
            .add_header(name, value)
            .json(&json!({"number": 1, "type": "Booth", "status": "Available"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert!(body["error"].as_str().unwrap().contains("Invalid table type"));
    }

    #[tokio::test]
    async fn test_mistyped_fields_are_bad_requests() {
        let app = create_test_app().await;
        let table = seed_table(&app.store, 1, TableKind::Regular, TableStatus::Available).await;
        let (name, value) = auth_header(&app, 1, Role::Administrator);

        for body in [
            json!({"number": "five", "type": "Regular", "status": "Available"}),
            json!({"number": 5, "type": 7, "status": "Available"}),
            json!({"number": 5, "type": "Regular", "status": true}),
        ] {
            let response = app
                .server
                .post("/api/tables")
                .add_header(name.clone(), value.clone())
                .json(&body)
                .await;
            response.assert_status(StatusCode::BAD_REQUEST);
            assert!(response.json::<serde_json::Value>()["error"].is_string());
        }

        app.server
            .put(&format!("/api/tables/{}", table.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"number": [1]}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .patch(&format!("/api/tables/{}/status", table.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": 3}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .post("/api/tables")
            .add_header(name, value)
            .text("number=5")
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = app.server.get(&format!("/api/tables/{}", table.id)).await;
        assert_eq!(response.json::<TableResponse>().number, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = create_test_app().await;
        let table = seed_table(&app.store, 1, TableKind::Regular, TableStatus::Available).await;
        let (name, value) = auth_header(&app, 1, Role::Administrator);

        let response = app
            .server
            .put(&format!("/api/tables/{}", table.id))
            .add_header(name.clone(), value.clone())
            .json(&json!({"type": "VIP"}))
            .await;
        response.assert_status_ok();
        let updated: TableResponse = response.json();
        assert_eq!(updated.kind, TableKind::Vip);
        assert_eq!(updated.number, 1);

        app.server
            .delete(&format!("/api/tables/{}", table.id))
            .add_header(name.clone(), value.clone())
            .await
            .assert_status_ok();
        app.server
            .delete(&format!("/api/tables/{}", table.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_conflicts_with_active_reservation() {
        let app = create_test_app().await;
        let table = seed_table(&app.store, 1, TableKind::Regular, TableStatus::Reserved).await;
        seed_reservation(&app.store, table.id, 42, hours_from_now(12), ReservationStatus::Pending).await;
        let (name, value) = auth_header(&app, 1, Role::Administrator);

        app.server
            .delete(&format!("/api/tables/{}", table.id))
            .add_header(name, value)
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_staff_status_patch() {
        let app = create_test_app().await;
        let table = seed_table(&app.store, 1, TableKind::Regular, TableStatus::Available).await;
        let (name, value) = auth_header(&app, 10, Role::Employee);
        let path = format!("/api/tables/{}/status", table.id);

        let response = app
            .server
            .patch(&path)
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "Occupied"}))
            .await;
        response.assert_status_ok();
        let change: TableStatusChangeResponse = response.json();
        assert!(change.changed);
        assert_eq!(change.table.status, TableStatus::Occupied);

        let response = app
            .server
            .patch(&path)
            .add_header(name.clone(), value.clone())
            .json(&json!({"status": "Occupied"}))
            .await;
        response.assert_status_ok();
        assert!(!response.json::<TableStatusChangeResponse>().changed);

        app.server
            .patch(&path)
            .add_header(name, value)
            .json(&json!({"status": "Closed"}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let (name, value) = auth_header(&app, 42, Role::Customer);
        app.server
            .patch(&path)
            .add_header(name, value)
            .json(&json!({"status": "Available"}))
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }
}
