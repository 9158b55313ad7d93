//! Configuration management.
//!
//! Configuration is layered, later sources overriding earlier ones:
//!
//! 1. Defaults from [`Config::default`]
//! 2. The YAML file named by `-f/--config` (or `TABLEBOOK_CONFIG`)
//! 3. `TABLEBOOK_`-prefixed environment variables, `__` separating nested keys
//!    (e.g. `TABLEBOOK_RESERVATIONS__CANCELLATION_WINDOW=48h`)
//! 4. `DATABASE_URL`, which selects the external database
//! 5. `JWT_SECRET`, shared with the auth service that issues identity tokens
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 3000
//! secret_key: change-me
//! database:
//!   type: external
//!   url: postgres://localhost/tablebook
//! reservations:
//!   initial_status: confirmed
//!   cancellation_window: 24h
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::db::models::reservations::ReservationStatus;
use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "TABLEBOOK_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// HS256 secret used to verify identity tokens
    pub secret_key: Option<String>,
    /// Set from the `DATABASE_URL` environment variable; folded into `database` on load
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Backing store
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    /// Customer lookups against the user service
    pub identity: IdentityConfig,
    pub reservations: ReservationPolicy,
    pub cors: CorsConfig,
    /// Raw repository endpoints under `/db`
    pub database_api: DatabaseApiConfig,
}

/// Which store backs the service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DatabaseConfig {
    /// Process-local store. Data is lost on shutdown.
    Memory,
    /// External PostgreSQL database
    External {
        url: String,
        #[serde(default)]
        pool: PoolSettings,
    },
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig::External {
            url: "postgres://localhost:5432/tablebook".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections to maintain
    pub min_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
    /// Time before idle connections are closed (seconds, 0 = never)
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection (seconds, 0 = never)
    pub max_lifetime_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,  // 10 minutes
            max_lifetime_secs: 1800, // 30 minutes
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Cookie carrying the identity token; checked before the Authorization header
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            cookie_name: "accessToken".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Customer collection endpoint; lookups go to `{base_url}/{id}`
    pub base_url: Url,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://user-service-app:4002/api/clientes").expect("static URL is valid"),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Business rules for bookings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReservationPolicy {
    /// Status given to new bookings. `confirmed` auto-confirms; `pending` leaves them for
    /// staff to confirm.
    pub initial_status: ReservationStatus,
    /// Minimum lead time for a customer to cancel their own booking
    #[serde(with = "humantime_serde")]
    pub cancellation_window: Duration,
    /// Length of the slot checked by availability searches
    #[serde(with = "humantime_serde")]
    pub availability_window: Duration,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            initial_status: ReservationStatus::Confirmed,
            cancellation_window: Duration::from_secs(24 * 60 * 60),
            availability_window: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins; `*` allows any
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
    /// Cache duration for preflight requests in seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
            max_age: Some(3600),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseApiConfig {
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            secret_key: None,
            database_url: None,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            identity: IdentityConfig::default(),
            reservations: ReservationPolicy::default(),
            cors: CorsConfig::default(),
            database_api: DatabaseApiConfig::default(),
        }
    }
}

impl Config {
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        // if database_url is set, use it (preserving existing pool settings)
        if let Some(url) = config.database_url.take() {
            let pool = match &config.database {
                DatabaseConfig::External { pool, .. } => pool.clone(),
                DatabaseConfig::Memory => PoolSettings::default(),
            };
            config.database = DatabaseConfig::External { url, pool };
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // TABLEBOOK_CONFIG names the file itself
            .merge(Env::prefixed("TABLEBOOK_").ignore(&["config"]).split("__"))
            .merge(Env::raw().only(&["DATABASE_URL"]).map(|_| "database_url".into()))
            .merge(Env::raw().only(&["JWT_SECRET"]).map(|_| "secret_key".into()))
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.as_deref().is_none_or(str::is_empty) {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                     Set JWT_SECRET or TABLEBOOK_SECRET_KEY, or add secret_key to the config file."
                    .to_string(),
            });
        }

        if let DatabaseConfig::External { url, .. } = &self.database {
            if url.trim().is_empty() {
                return Err(Error::Internal {
                    operation: "Config validation: database.url must not be empty for an external database".to_string(),
                });
            }
        }

        let policy = &self.reservations;
        if policy.cancellation_window.is_zero() || policy.availability_window.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: reservation windows must be greater than zero".to_string(),
            });
        }
        if policy.initial_status == ReservationStatus::Cancelled {
            return Err(Error::Internal {
                operation: "Config validation: reservations.initial_status must be pending or confirmed".to_string(),
            });
        }

        if self.identity.timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: identity.timeout must be greater than zero".to_string(),
            });
        }

        if self.cors.allow_credentials && self.cors.allowed_origins.iter().any(|origin| origin == "*") {
            return Err(Error::Internal {
                operation: "Config validation: CORS wildcard origin cannot be combined with allow_credentials".to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_yaml_and_defaults() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file(
                "test.yaml",
                r#"
secret_key: hello
port: 4003
database:
  type: memory
reservations:
  cancellation_window: 48h
"#,
            )?;

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.port, 4003);
            assert!(matches!(config.database, DatabaseConfig::Memory));
            assert_eq!(config.reservations.cancellation_window, Duration::from_secs(48 * 3600));
            // untouched defaults
            assert_eq!(config.reservations.availability_window, Duration::from_secs(3600));
            assert_eq!(config.reservations.initial_status, ReservationStatus::Confirmed);
            assert_eq!(config.auth.cookie_name, "accessToken");
            assert!(!config.database_api.enabled);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("test.yaml", "secret_key: hello\n")?;
            jail.set_env("TABLEBOOK_HOST", "127.0.0.1");
            jail.set_env("TABLEBOOK_RESERVATIONS__INITIAL_STATUS", "pending");
            jail.set_env("TABLEBOOK_IDENTITY__BASE_URL", "http://users.internal/api/clientes");
            jail.set_env("DATABASE_URL", "postgres://db.internal/tablebook");

            let config = Config::load(&args("test.yaml"))?;

            assert_eq!(config.host, "127.0.0.1");
            assert_eq!(config.reservations.initial_status, ReservationStatus::Pending);
            assert_eq!(config.identity.base_url.as_str(), "http://users.internal/api/clientes");
            match &config.database {
                DatabaseConfig::External { url, .. } => assert_eq!(url, "postgres://db.internal/tablebook"),
                other => panic!("expected external database, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_jwt_secret_env() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("test.yaml", "database:\n  type: memory\n")?;
            jail.set_env("JWT_SECRET", "from-env");

            let config = Config::load(&args("test.yaml"))?;
            assert_eq!(config.secret_key.as_deref(), Some("from-env"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("test.yaml", "port: 3000\n")?;
            let err = Config::load(&args("test.yaml")).unwrap_err();
            assert!(err.to_string().contains("secret_key"));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        Jail::expect_with(|jail| {
            jail.clear_env();
            jail.create_file("test.yaml", "secret_key: hello\nnot_a_field: 1\n")?;
            assert!(Config::load(&args("test.yaml")).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_validation_rules() {
        let base = Config {
            secret_key: Some("s".to_string()),
            ..Default::default()
        };
        assert!(base.validate().is_ok());

        let mut config = base.clone();
        config.reservations.cancellation_window = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.reservations.initial_status = ReservationStatus::Cancelled;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.cors.allowed_origins = vec!["*".to_string()];
        config.cors.allow_credentials = true;
        assert!(config.validate().is_err());

        let mut config = base;
        config.database = DatabaseConfig::External {
            url: " ".to_string(),
            pool: PoolSettings::default(),
        };
        assert!(config.validate().is_err());
    }
}
