//! Customer identity lookups against the user service.
//!
//! Reservations reference customers by id only; the customer record itself lives in
//! the user service. Before booking, the caller's customer id is resolved there using
//! the caller's own bearer credential.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::types::CustomerId;

/// A customer record as returned by the user service. Only the id is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(alias = "idCliente", default)]
    pub id: Option<CustomerId>,
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum IdentityError {
    /// The user service refused the forwarded credential
    #[error("identity lookup rejected with status {status}")]
    Rejected { status: u16 },

    /// Network failure, timeout, or an unexpected response
    #[error("identity lookup failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when the user service has no such customer.
    async fn find_customer(&self, customer_id: CustomerId, bearer: &str) -> Result<Option<Customer>, IdentityError>;
}

/// Resolves customers with `GET {base_url}/{id}`.
#[derive(Clone)]
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpIdentityResolver {
    pub fn new(base_url: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn customer_url(&self, customer_id: CustomerId) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), customer_id)
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    #[instrument(skip(self, bearer), err)]
    async fn find_customer(&self, customer_id: CustomerId, bearer: &str) -> Result<Option<Customer>, IdentityError> {
        let response = self
            .client
            .get(self.customer_url(customer_id))
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(%status, "identity lookup response");

        match status {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(IdentityError::Rejected { status: status.as_u16() }),
            s if s.is_success() => {
                let customer = response
                    .json::<Customer>()
                    .await
                    .map_err(|e| IdentityError::Transport(format!("invalid customer payload: {e}")))?;
                Ok(Some(customer))
            }
            s => Err(IdentityError::Transport(format!("unexpected status {s}"))),
        }
    }
}
