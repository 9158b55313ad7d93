//! The authenticated caller, extracted from the request.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{instrument, trace};

use crate::{
    AppState,
    auth::session,
    db::handlers::Store,
    errors::{Error, Result},
    types::Role,
};

/// Who is asking. Built from a verified identity token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
    pub active: bool,
    /// The raw bearer credential, forwarded to the user service on customer lookups
    pub token: String,
}

impl CurrentUser {
    /// 403 unless the account is active
    pub fn require_active(&self) -> Result<&Self> {
        if self.active {
            Ok(self)
        } else {
            Err(Error::forbidden("Account is inactive"))
        }
    }

    /// 403 unless the caller has one of the given roles
    pub fn require_role(&self, allowed: &[Role]) -> Result<&Self> {
        if allowed.contains(&self.role) {
            Ok(self)
        } else {
            Err(Error::forbidden(format!("Access denied for role {}", self.role)))
        }
    }

    /// Active customer accounts only
    pub fn require_customer(&self) -> Result<&Self> {
        self.require_role(&[Role::Customer])?.require_active()
    }

    /// Active employee or administrator accounts only
    pub fn require_staff(&self) -> Result<&Self> {
        self.require_role(Role::STAFF)?.require_active()
    }

    /// Active administrator accounts only
    pub fn require_admin(&self) -> Result<&Self> {
        self.require_role(&[Role::Administrator])?.require_active()
    }
}

/// Pull the bearer credential from the session cookie, falling back to the
/// `Authorization: Bearer` header.
fn bearer_token(parts: &Parts, cookie_name: &str) -> Result<Option<String>> {
    if let Some(cookie_header) = parts.headers.get(axum::http::header::COOKIE) {
        let cookie_str = cookie_header.to_str().map_err(|e| Error::BadRequest {
            message: format!("Invalid cookie header: {e}"),
        })?;

        for cookie in cookie_str.split(';') {
            let cookie = cookie.trim();
            if let Some((name, value)) = cookie.split_once('=') {
                if name == cookie_name && !value.is_empty() {
                    trace!("Found session cookie");
                    return Ok(Some(value.to_string()));
                }
            }
        }
    }

    if let Some(auth_header) = parts.headers.get(axum::http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|e| Error::BadRequest {
            message: format!("Invalid authorization header: {e}"),
        })?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Ok(Some(token.to_string()));
            }
        }
    }

    Ok(None)
}

impl<S: Store> FromRequestParts<AppState<S>> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState<S>) -> Result<Self> {
        let token = bearer_token(parts, &state.config.auth.cookie_name)?.ok_or_else(|| Error::Unauthenticated {
            message: Some("No token provided".to_string()),
        })?;

        let claims = session::verify_session_token(&token, &state.config)?;
        Ok(CurrentUser {
            id: claims.id,
            role: claims.role,
            active: claims.active,
            token,
        })
    }
}
