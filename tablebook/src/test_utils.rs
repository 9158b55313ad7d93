//! Shared test helpers: config, a scripted identity resolver, token headers and seeding.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, header};
use axum_test::TestServer;
use chrono::{DateTime, Utc};

use crate::auth::session::{SessionClaims, create_session_token};
use crate::config::{Config, DatabaseConfig};
use crate::db::handlers::{InMemoryStore, Repository, Session, Store};
use crate::db::models::{
    reservations::{ReservationCreateDBRequest, ReservationDBResponse, ReservationStatus},
    tables::{TableCreateDBRequest, TableDBResponse, TableKind, TableStatus},
};
use crate::identity::{Customer, IdentityError, IdentityResolver};
use crate::types::{CustomerId, Role, TableId};

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        secret_key: Some("test-secret-key-for-tablebook".to_string()),
        database_url: None,
        database: DatabaseConfig::Memory,
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    Reject,
    Fail,
}

/// Identity resolver answering from a fixed set of customer ids.
#[derive(Default)]
pub struct MockIdentityResolver {
    customers: Mutex<HashSet<CustomerId>>,
    mode: Mutex<Mode>,
    calls: Mutex<Vec<(CustomerId, String)>>,
}

impl MockIdentityResolver {
    pub fn with_customers(ids: impl IntoIterator<Item = CustomerId>) -> Self {
        let resolver = Self::default();
        resolver.customers.lock().unwrap().extend(ids);
        resolver
    }

    pub fn add_customer(&self, id: CustomerId) {
        self.customers.lock().unwrap().insert(id);
    }

    /// Answer every lookup as if the credential were refused
    pub fn reject(&self) {
        *self.mode.lock().unwrap() = Mode::Reject;
    }

    /// Answer every lookup with a transport failure
    pub fn fail(&self) {
        *self.mode.lock().unwrap() = Mode::Fail;
    }

    pub fn calls(&self) -> Vec<(CustomerId, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityResolver for MockIdentityResolver {
    async fn find_customer(&self, customer_id: CustomerId, bearer: &str) -> Result<Option<Customer>, IdentityError> {
        self.calls.lock().unwrap().push((customer_id, bearer.to_string()));

        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Reject => Err(IdentityError::Rejected { status: 401 }),
            Mode::Fail => Err(IdentityError::Transport("connection refused".to_string())),
            Mode::Normal if self.customers.lock().unwrap().contains(&customer_id) => Ok(Some(Customer {
                id: Some(customer_id),
                attributes: Default::default(),
            })),
            Mode::Normal => Ok(None),
        }
    }
}

pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryStore,
    pub identity: Arc<MockIdentityResolver>,
    pub config: Config,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

pub async fn create_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = create_test_config();
    customize(&mut config);

    let store = InMemoryStore::new();
    let identity = Arc::new(MockIdentityResolver::default());
    let state = crate::build_state(store.clone(), identity.clone(), config.clone());
    let router = crate::build_router(state).expect("Failed to build router");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        store,
        identity,
        config,
    }
}

fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&format!("Bearer {token}")).expect("token is a valid header value");
    (header::AUTHORIZATION, value)
}

pub fn auth_header(app: &TestApp, id: i64, role: Role) -> (HeaderName, HeaderValue) {
    let claims = SessionClaims::new(id, role, true, Duration::from_secs(3600));
    bearer(&create_session_token(&claims, &app.config).expect("Failed to sign token"))
}

pub fn inactive_auth_header(app: &TestApp, id: i64) -> (HeaderName, HeaderValue) {
    let claims = SessionClaims::new(id, Role::Customer, false, Duration::from_secs(3600));
    bearer(&create_session_token(&claims, &app.config).expect("Failed to sign token"))
}

pub fn expired_auth_header(app: &TestApp, id: i64, role: Role) -> (HeaderName, HeaderValue) {
    let claims = SessionClaims {
        exp: Utc::now().timestamp() - 3600,
        ..SessionClaims::new(id, role, true, Duration::from_secs(3600))
    };
    bearer(&create_session_token(&claims, &app.config).expect("Failed to sign token"))
}

pub fn hours_from_now(hours: i64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::hours(hours)
}

pub async fn seed_table<S: Store>(store: &S, number: i32, kind: TableKind, status: TableStatus) -> TableDBResponse {
    let mut session = store.begin().await.expect("Failed to open session");
    let table = session
        .tables()
        .create(&TableCreateDBRequest { number, kind, status })
        .await
        .expect("Failed to create test table");
    session.commit().await.expect("Failed to commit test table");
    table
}

pub async fn seed_reservation<S: Store>(
    store: &S,
    table_id: TableId,
    customer_id: CustomerId,
    reserved_at: DateTime<Utc>,
    status: ReservationStatus,
) -> ReservationDBResponse {
    let mut session = store.begin().await.expect("Failed to open session");
    let reservation = session
        .reservations()
        .create(&ReservationCreateDBRequest {
            status,
            reserved_at,
            table_id,
            customer_id,
            party_size: 2,
        })
        .await
        .expect("Failed to create test reservation");
    session.commit().await.expect("Failed to commit test reservation");
    reservation
}
