use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::api::auth::{expired_session_cookie, session_cookie};
use crate::api::AppState;
use crate::domain::value_objects::Email;
use crate::Result;

pub async fn root() -> &'static str { "e-mart is running" }

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy", "service": "emart-commerce"}))
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(email)]
    pub email: String,
}

pub async fn issue_token(State(s): State<AppState>, Json(r): Json<TokenRequest>) -> Result<impl IntoResponse> {
    r.validate()?;
    let email = Email::new(r.email)?;
    let token = s.auth.issue(email.as_str())?;
    let cookie = session_cookie(&token, s.auth.ttl_secs());
    Ok(([(header::SET_COOKIE, cookie)], Json(json!({ "token": token }))))
}

pub async fn clear_token() -> impl IntoResponse {
    ([(header::SET_COOKIE, expired_session_cookie())], Json(true))
}
