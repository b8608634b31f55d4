use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::{AppState, AuthUser};
use crate::repository::OrderStats;
use crate::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: i64,
    pub products: i64,
    #[serde(flatten)]
    pub orders: OrderStats,
}

pub async fn stats(State(s): State<AppState>, user: AuthUser) -> Result<Json<AdminStats>> {
    user.require_admin(&s.repos).await?;
    let (users, products, orders) = tokio::try_join!(
        s.repos.profiles.count(),
        s.repos.products.count(),
        s.repos.orders.stats(),
    )?;
    Ok(Json(AdminStats { users, products, orders }))
}
