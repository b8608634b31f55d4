//! Profile Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub role: Role,
    /// Loyalty coin balance.
    pub coin: i64,
    /// Coupon codes applied so far, one entry per use.
    pub coupon: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(email: impl Into<String>, name: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            email: email.into(), name: name.into(), phone: None, address: String::new(), city: city.into(),
            role: Role::User, coin: 0, coupon: vec![], created_at: Utc::now(),
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self { self.phone = Some(phone.into()); self }
    pub fn with_address(mut self, address: impl Into<String>) -> Self { self.address = address.into(); self }
    pub fn with_role(mut self, role: Role) -> Self { self.role = role; self }
    pub fn with_coin(mut self, coin: i64) -> Self { self.coin = coin; self }

    pub fn has_any_role(&self, roles: &[Role]) -> bool { roles.contains(&self.role) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "Order Manager")]
    OrderManager,
    #[serde(rename = "Delivery Partner")]
    DeliveryPartner,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::OrderManager => "Order Manager",
            Self::DeliveryPartner => "Delivery Partner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Role {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "Order Manager" => Ok(Self::OrderManager),
            "Delivery Partner" => Ok(Self::DeliveryPartner),
            other => Err(format!("unknown role {other}")),
        }
    }
}
