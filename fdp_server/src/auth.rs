//! Access tokens.
//!
//! Users and their sessions are managed by a separate service. That service and this one share the `FDP_JWT_SECRET`
//! and tokens are signed with HS256. All this server needs from a token is who the caller is and which role they act
//! in.
use std::{
    future::{ready, Ready},
    time::Duration,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use fdp_engine::{db_types::Role, order_objects::AuthenticatedUser};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::AuthError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiry, in seconds since the unix epoch
    pub exp: i64,
}

impl JwtClaims {
    pub fn new<S: Into<String>>(user_id: S, role: Role) -> Self {
        Self { sub: user_id.into(), role, name: None, email: None, exp: 0 }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn user(&self) -> AuthenticatedUser {
        AuthenticatedUser { user_id: self.sub.clone(), role: self.role, name: self.name.clone(), email: self.email.clone() }
    }
}

/// Handlers behind the JWT middleware take `JwtClaims` as an argument. Anywhere else the extraction fails with a 401.
impl FromRequest for JwtClaims {
    type Error = AuthError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(req.extensions().get::<JwtClaims>().cloned().ok_or(AuthError::MissingToken))
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!("🔐️ Rejected access token. {e}");
            match e.kind() {
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    AuthError::PoorlyFormattedToken(e.to_string())
                },
                _ => AuthError::ValidationError(e.to_string()),
            }
        })?;
        trace!("🔐️ Access token validated for {} ({})", data.claims.sub, data.claims.role);
        Ok(data.claims)
    }
}

pub struct TokenIssuer {
    key: EncodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { key, lifetime: config.token_lifetime }
    }

    /// Signs the claims, overwriting `exp` with the configured lifetime unless a duration is given.
    pub fn issue_token(&self, mut claims: JwtClaims, duration: Option<Duration>) -> Result<String, AuthError> {
        let lifetime = duration.unwrap_or(self.lifetime);
        claims.exp = Utc::now().timestamp() + lifetime.as_secs() as i64;
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::CouldNotIssueToken(e.to_string()))
    }
}
