//! # tablebook: tables and reservations for restaurant bookings
//!
//! `tablebook` is an HTTP service that tracks a restaurant's dining tables and the
//! reservations customers make against them. Customers search for free tables, book
//! them and cancel their bookings; staff confirm and cancel bookings, list the day's
//! reservations, and move tables between `Available`, `Reserved`, `Occupied` and
//! `Out of service`.
//!
//! ## Architecture
//!
//! - [`db`]: row models and repositories behind the [`Store`](db::handlers::Store) /
//!   [`Session`](db::handlers::Session) unit of work, with a Postgres and an in-memory
//!   implementation
//! - [`services`]: the booking rules. [`TableService`](services::TableService) owns table
//!   status; [`ReservationService`](services::ReservationService) coordinates a
//!   reservation with the table it occupies
//! - [`api`]: axum handlers and their request/response models
//! - [`auth`]: identity tokens issued by the user service, and [`CurrentUser`]
//! - [`identity`]: customer lookups against the user service
//!
//! A reservation write and the table status change that goes with it always run in one
//! session, so they commit together. Booking locks the table row first, so two customers
//! racing for the same table cannot both get it.
//!
//! ## Running
//!
//! ```bash
//! tablebook -f config.yaml
//! tablebook -f config.yaml --validate
//! ```
//!
//! See [`config`] for the available settings.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod identity;
pub mod services;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    http::{self, HeaderValue, Method},
    routing::{get, patch, post, put},
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};

pub use auth::CurrentUser;
pub use config::Config;

use crate::api::handlers::{database, reservations, tables};
use crate::config::{CorsConfig, DatabaseConfig, PoolSettings};
use crate::db::handlers::{InMemoryStore, PgStore, Store};
use crate::identity::{HttpIdentityResolver, IdentityResolver};
use crate::services::{ReservationService, TableService};

/// Application state shared across all request handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .store(store.clone())
///     .tables(TableService::new(store.clone()))
///     .reservations(ReservationService::new(store, identity, policy))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState<S: Store> {
    pub config: Config,
    pub store: S,
    pub tables: TableService<S>,
    pub reservations: ReservationService<S>,
}

/// Wire the services to `store` and `identity`.
pub fn build_state<S: Store>(store: S, identity: Arc<dyn IdentityResolver>, config: Config) -> AppState<S> {
    let policy = config.reservations.clone();
    AppState::builder()
        .tables(TableService::new(store.clone()))
        .reservations(ReservationService::new(store.clone(), identity, policy))
        .store(store)
        .config(config)
        .build()
}

/// Get the tablebook database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION, http::header::COOKIE]);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()?;
        cors = cors.allow_origin(origins).allow_credentials(config.allow_credentials);
    }

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

fn reservation_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/availability", get(reservations::check_availability::<S>))
        .route("/reserve", post(reservations::reserve_table::<S>))
        .route("/history", get(reservations::reservation_history::<S>))
        .route("/daily", get(reservations::daily_reservations::<S>))
        .route("/staff/status", get(reservations::reservations_by_status::<S>))
        .route("/{id}/status", get(reservations::reservation_status::<S>))
        .route("/{id}/cancel", axum::routing::delete(reservations::cancel_reservation::<S>))
        .route("/{id}/confirm", put(reservations::confirm_reservation::<S>))
        .route(
            "/{id}/cancel-staff",
            axum::routing::delete(reservations::cancel_reservation_by_staff::<S>),
        )
}

fn table_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(tables::list_tables::<S>).post(tables::create_table::<S>))
        .route("/status/{status}", get(tables::list_tables_by_status::<S>))
        .route(
            "/{id}",
            get(tables::get_table::<S>)
                .put(tables::update_table::<S>)
                .delete(tables::delete_table::<S>),
        )
        .route("/{id}/status", patch(tables::update_table_status::<S>))
}

fn database_routes<S: Store>() -> Router<AppState<S>> {
    let tables = Router::new()
        .route("/", get(database::list_tables::<S>).post(database::create_table::<S>))
        .route("/status/{status}", get(database::tables_by_status::<S>))
        .route(
            "/{id}",
            get(database::get_table::<S>)
                .put(database::update_table::<S>)
                .delete(database::delete_table::<S>),
        );

    let reservations = Router::new()
        .route(
            "/",
            get(database::list_reservations::<S>).post(database::create_reservation::<S>),
        )
        .route("/customer/{id}", get(database::reservations_by_customer::<S>))
        .route("/status/{status}", get(database::reservations_by_status::<S>))
        .route(
            "/{id}",
            get(database::get_reservation::<S>)
                .put(database::update_reservation::<S>)
                .delete(database::delete_reservation::<S>),
        );

    Router::new().nest("/tables", tables).nest("/reservations", reservations)
}

/// Build the application router with all endpoints and middleware.
///
/// - `/healthz`
/// - `/api/reservations` and `/api/tables`
/// - `/db`, when the raw database API is enabled
/// - CORS and request tracing
#[instrument(skip_all)]
pub fn build_router<S: Store>(state: AppState<S>) -> anyhow::Result<Router> {
    let mut router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .nest("/api/reservations", reservation_routes::<S>())
        .nest("/api/tables", table_routes::<S>());

    if state.config.database_api.enabled {
        warn!("Raw database API enabled under /db; it is unauthenticated");
        router = router.nest("/db", database_routes::<S>());
    }

    let cors = create_cors_layer(&state.config.cors)?;
    let router = router.with_state(state).layer(cors).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

async fn connect_pool(url: &str, settings: &PoolSettings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout((settings.idle_timeout_secs > 0).then(|| Duration::from_secs(settings.idle_timeout_secs)))
        .max_lifetime((settings.max_lifetime_secs > 0).then(|| Duration::from_secs(settings.max_lifetime_secs)))
        .connect(url)
        .await?;

    migrator().run(&pool).await?;
    Ok(pool)
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] connects the store (running migrations for
///    Postgres) and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until
///    the shutdown signal fires, then closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting tablebook with configuration: {:#?}", config);

        let identity: Arc<dyn IdentityResolver> =
            Arc::new(HttpIdentityResolver::new(config.identity.base_url.clone(), config.identity.timeout)?);

        let (router, pool) = match &config.database {
            DatabaseConfig::Memory => {
                warn!("Using the in-memory store; data will be lost on shutdown");
                let state = build_state(InMemoryStore::new(), identity, config.clone());
                (build_router(state)?, None)
            }
            DatabaseConfig::External { url, pool } => {
                let pool = connect_pool(url, pool).await?;
                let state = build_state(PgStore::new(pool.clone()), identity, config.clone());
                (build_router(state)?, Some(pool))
            }
        };

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("tablebook listening on http://{}", bind_addr);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        Ok(())
    }
}
