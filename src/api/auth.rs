//! Session tokens: HS256 JWTs carried in the `_et` cookie or a bearer header.

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::aggregates::{Profile, Role};
use crate::repository::Repositories;
use crate::{EcommerceError, Result};

pub const SESSION_COOKIE: &str = "_et";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl AuthKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 { self.ttl_secs }

    pub fn issue(&self, email: &str) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = Claims { email: email.to_string(), iat, exp: iat + self.ttl_secs };
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| EcommerceError::Internal(format!("token encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected session token");
                EcommerceError::forbidden("Invalid token.")
            })
    }
}

/// The authenticated caller, identified by the email in their token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
}

impl AuthUser {
    /// Loads the caller's profile; callers without one have no roles.
    pub async fn profile(&self, repos: &Repositories) -> Result<Profile> {
        repos.profiles.get(&self.email).await?.ok_or_else(|| EcommerceError::forbidden("forbidden message"))
    }

    pub async fn require_role(&self, repos: &Repositories, roles: &[Role]) -> Result<Profile> {
        let profile = self.profile(repos).await?;
        if !profile.has_any_role(roles) {
            return Err(EcommerceError::forbidden("forbidden message"));
        }
        Ok(profile)
    }

    pub async fn require_admin(&self, repos: &Repositories) -> Result<Profile> {
        self.require_role(repos, &[Role::Admin]).await
    }

    /// The caller may act for `email` only if it is their own.
    pub fn ensure_self(&self, email: &str) -> Result<()> {
        if !self.email.eq_ignore_ascii_case(email.trim()) {
            return Err(EcommerceError::Unauthorized("unauthorized".into()));
        }
        Ok(())
    }
}

fn session_token(parts: &Parts) -> Option<String> {
    let from_cookie = parts.headers.get_all(header::COOKIE).iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        });
    from_cookie.or_else(|| {
        parts.headers.get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = session_token(parts).ok_or_else(|| EcommerceError::Unauthorized("Authorization header missing.".into()))?;
        let claims = state.auth.verify(&token)?;
        Ok(AuthUser { email: claims.email.to_lowercase() })
    }
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age: i64) -> String {
    format!("{SESSION_COOKIE}={token}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={max_age}")
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0")
}
