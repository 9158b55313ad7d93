use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rstest::{fixture, rstest};

use crate::db::errors::DbError;
use crate::db::handlers::{InMemoryStore, ReservationRepository, Repository, Session, Store, TableRepository};
use crate::db::models::{
    reservations::{ReservationCreateDBRequest, ReservationFilter, ReservationStatus, ReservationUpdateDBRequest, TimeWindow},
    tables::{TableCreateDBRequest, TableFilter, TableKind, TableStatus, TableUpdateDBRequest},
};
use crate::types::TableId;

#[cfg(feature = "postgres-tests")]
use crate::db::handlers::PgStore;

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
}

async fn seed_table<S: Store>(store: &S, number: i32, status: TableStatus) -> TableId {
    let mut session = store.begin().await.unwrap();
    let table = session
        .tables()
        .create(&TableCreateDBRequest {
            number,
            kind: TableKind::Regular,
            status,
        })
        .await
        .unwrap();
    session.commit().await.unwrap();
    table.id
}

fn booking(table_id: TableId, customer_id: i64, reserved_at: DateTime<Utc>) -> ReservationCreateDBRequest {
    ReservationCreateDBRequest {
        status: ReservationStatus::Confirmed,
        reserved_at,
        table_id,
        customer_id,
        party_size: 2,
    }
}

/// Fixture that returns InMemoryStore
#[fixture]
fn in_memory_store() -> InMemoryStore {
    InMemoryStore::new()
}

async fn run_test_table_crud<S: Store>(store: &S) {
    let first = seed_table(store, 1, TableStatus::Available).await;
    let second = seed_table(store, 2, TableStatus::Occupied).await;

    let mut session = store.begin().await.unwrap();
    let all = session.tables().list(&TableFilter::default()).await.unwrap();
    assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![first, second]);

    let occupied = session.tables().find_by_status(TableStatus::Occupied).await.unwrap();
    assert_eq!(occupied.len(), 1);
    assert_eq!(occupied[0].number, 2);

    let updated = session
        .tables()
        .update(
            first,
            &TableUpdateDBRequest {
                kind: Some(TableKind::Vip),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .expect("table exists");
    assert_eq!(updated.kind, TableKind::Vip);
    // Fields not supplied are kept
    assert_eq!(updated.number, 1);
    assert_eq!(updated.status, TableStatus::Available);

    let missing = session.tables().update(9999, &TableUpdateDBRequest::status(TableStatus::Reserved)).await.unwrap();
    assert!(missing.is_none());

    assert_eq!(session.tables().delete(second).await.unwrap(), 1);
    assert_eq!(session.tables().delete(second).await.unwrap(), 0);
    assert!(session.tables().get_by_id(second).await.unwrap().is_none());
    session.commit().await.unwrap();
}

#[rstest]
#[tokio::test]
async fn test_table_crud(in_memory_store: InMemoryStore) {
    run_test_table_crud(&in_memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test(migrations = "./migrations")]
async fn test_table_crud_postgres(pool: sqlx::PgPool) {
    run_test_table_crud(&PgStore::new(pool)).await;
}

async fn run_test_uncommitted_session_is_discarded<S: Store>(store: &S) {
    let table_id = seed_table(store, 1, TableStatus::Available).await;

    {
        let mut session = store.begin().await.unwrap();
        session.reservations().create(&booking(table_id, 42, at(18, 0))).await.unwrap();
        session
            .tables()
            .update(table_id, &TableUpdateDBRequest::status(TableStatus::Reserved))
            .await
            .unwrap();
        // dropped without commit
    }

    let mut session = store.begin().await.unwrap();
    let table = session.tables().get_by_id(table_id).await.unwrap().unwrap();
    assert_eq!(table.status, TableStatus::Available);
    assert!(session.reservations().find_by_customer(42).await.unwrap().is_empty());
}

#[rstest]
#[tokio::test]
async fn test_uncommitted_session_is_discarded(in_memory_store: InMemoryStore) {
    run_test_uncommitted_session_is_discarded(&in_memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test(migrations = "./migrations")]
async fn test_uncommitted_session_is_discarded_postgres(pool: sqlx::PgPool) {
    run_test_uncommitted_session_is_discarded(&PgStore::new(pool)).await;
}

async fn run_test_reservation_requires_existing_table<S: Store>(store: &S) {
    let mut session = store.begin().await.unwrap();
    let err = session.reservations().create(&booking(777, 42, at(18, 0))).await.unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "unexpected error: {err:?}");
}

#[rstest]
#[tokio::test]
async fn test_reservation_requires_existing_table(in_memory_store: InMemoryStore) {
    run_test_reservation_requires_existing_table(&in_memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test(migrations = "./migrations")]
async fn test_reservation_requires_existing_table_postgres(pool: sqlx::PgPool) {
    run_test_reservation_requires_existing_table(&PgStore::new(pool)).await;
}

async fn run_test_reservation_lookups<S: Store>(store: &S) {
    let table_id = seed_table(store, 7, TableStatus::Available).await;

    let mut session = store.begin().await.unwrap();
    let late = session.reservations().create(&booking(table_id, 42, at(20, 0))).await.unwrap();
    let early = session.reservations().create(&booking(table_id, 42, at(18, 0))).await.unwrap();
    let other = session.reservations().create(&booking(table_id, 43, at(19, 0))).await.unwrap();
    session
        .reservations()
        .update(other.id, &ReservationUpdateDBRequest::status(ReservationStatus::Cancelled))
        .await
        .unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();

    // Ordered by timestamp, not insertion
    let mine = session.reservations().find_by_customer(42).await.unwrap();
    assert_eq!(mine.iter().map(|r| r.id).collect::<Vec<_>>(), vec![early.id, late.id]);

    let cancelled = session.reservations().find_by_status(ReservationStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].customer_id, 43);

    let window = TimeWindow::half_open(at(18, 0), Duration::hours(1));
    let in_window = session
        .reservations()
        .list(&ReservationFilter::default().within(window))
        .await
        .unwrap();
    assert_eq!(in_window.iter().map(|r| r.id).collect::<Vec<_>>(), vec![early.id]);

    let day = TimeWindow::day(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    let joined = session
        .reservations()
        .list_with_table(&ReservationFilter::default().within(day).for_table(table_id))
        .await
        .unwrap();
    assert_eq!(joined.len(), 3);
    let summary = joined[0].table.expect("table is joined");
    assert_eq!(summary.number, 7);
    assert_eq!(summary.kind, TableKind::Regular);
}

#[rstest]
#[tokio::test]
async fn test_reservation_lookups(in_memory_store: InMemoryStore) {
    run_test_reservation_lookups(&in_memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test(migrations = "./migrations")]
async fn test_reservation_lookups_postgres(pool: sqlx::PgPool) {
    run_test_reservation_lookups(&PgStore::new(pool)).await;
}

async fn run_test_deleting_table_keeps_history<S: Store>(store: &S) {
    let table_id = seed_table(store, 3, TableStatus::Available).await;

    let mut session = store.begin().await.unwrap();
    let reservation = session.reservations().create(&booking(table_id, 42, at(18, 0))).await.unwrap();
    assert_eq!(session.tables().delete(table_id).await.unwrap(), 1);
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    let kept = session.reservations().get_by_id(reservation.id).await.unwrap().unwrap();
    assert_eq!(kept.table_id, None);

    let joined = session.reservations().list_with_table(&ReservationFilter::default()).await.unwrap();
    assert_eq!(joined.len(), 1);
    assert!(joined[0].table.is_none());
}

#[rstest]
#[tokio::test]
async fn test_deleting_table_keeps_history(in_memory_store: InMemoryStore) {
    run_test_deleting_table_keeps_history(&in_memory_store).await;
}

#[cfg(feature = "postgres-tests")]
#[sqlx::test(migrations = "./migrations")]
async fn test_deleting_table_keeps_history_postgres(pool: sqlx::PgPool) {
    run_test_deleting_table_keeps_history(&PgStore::new(pool)).await;
}
