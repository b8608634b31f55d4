use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::EmailQuery;
use crate::api::{AppState, AuthUser};
use crate::domain::aggregates::{Profile, Role};
use crate::domain::value_objects::Email;
use crate::{EcommerceError, Result};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 6, max = 20))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
}

pub async fn register(State(s): State<AppState>, Json(r): Json<RegisterRequest>) -> Result<impl IntoResponse> {
    r.validate()?;
    let email = Email::new(r.email)?;
    let mut profile = Profile::new(email.as_str(), r.name.trim(), r.city.trim());
    if let Some(phone) = r.phone { profile = profile.with_phone(phone.trim()); }
    if let Some(address) = r.address { profile = profile.with_address(address.trim()); }

    if !s.repos.profiles.insert(&profile).await? {
        return Ok((StatusCode::OK, Json(json!({ "message": "user already exists" }))));
    }
    tracing::info!(email = %email, "profile registered");
    Ok((StatusCode::CREATED, Json(json!({ "inserted": true, "profile": profile }))))
}

pub async fn list_users(State(s): State<AppState>, user: AuthUser) -> Result<Json<Vec<Profile>>> {
    user.require_admin(&s.repos).await?;
    Ok(Json(s.repos.profiles.list().await?))
}

pub async fn is_admin(State(s): State<AppState>, user: AuthUser, Path(email): Path<String>) -> Result<impl IntoResponse> {
    if user.ensure_self(&email).is_err() {
        return Ok(Json(json!({ "admin": false })));
    }
    let profile = s.repos.profiles.get(&user.email).await?;
    Ok(Json(json!({ "admin": profile.map(|p| p.role == Role::Admin).unwrap_or(false) })))
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

pub async fn set_role(State(s): State<AppState>, user: AuthUser, Path(email): Path<String>, Json(r): Json<RoleRequest>) -> Result<impl IntoResponse> {
    user.require_admin(&s.repos).await?;
    let email = Email::new(email)?;
    if !s.repos.profiles.set_role(email.as_str(), r.role).await? {
        return Err(EcommerceError::not_found("Profile not found"));
    }
    tracing::info!(email = %email, role = %r.role, by = %user.email, "role changed");
    Ok(Json(json!({ "email": email, "role": r.role })))
}

pub async fn profile(State(s): State<AppState>, user: AuthUser, Query(q): Query<EmailQuery>) -> Result<Json<Profile>> {
    let email = match q.email {
        Some(email) => Email::new(email)?,
        None => Email::new(user.email.clone())?,
    };
    if user.ensure_self(email.as_str()).is_err() {
        user.require_admin(&s.repos).await?;
    }
    let profile = s.repos.profiles.get(email.as_str()).await?.ok_or_else(|| EcommerceError::not_found("Profile not found"))?;
    Ok(Json(profile))
}
