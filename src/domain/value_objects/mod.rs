//! Value Objects for the storefront

use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalised user email, used as the identity key for profiles and carts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(value: impl Into<String>) -> Result<Self, EmailError> {
        let value = value.into().trim().to_lowercase();
        if value.is_empty() { return Err(EmailError::Empty); }
        match value.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(value)),
            _ => Err(EmailError::Malformed),
        }
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Email {
    type Error = EmailError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Email> for String {
    fn from(e: Email) -> Self { e.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone)] pub enum EmailError { Empty, Malformed }
impl std::error::Error for EmailError {}
impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "email empty"), Self::Malformed => write!(f, "email malformed") }
    }
}

/// One-time delivery code.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Otp(String);

impl Otp {
    pub const LEN: usize = 6;

    pub fn generate() -> Self {
        let code = rand::thread_rng().sample_iter(&Alphanumeric).take(Self::LEN).map(char::from).collect();
        Self(code)
    }

    pub fn from_stored(code: impl Into<String>) -> Self { Self(code.into()) }
    pub fn as_str(&self) -> &str { &self.0 }

    /// Exact, case-sensitive comparison against a submitted code.
    pub fn matches(&self, submitted: &str) -> bool {
        let a = self.0.as_bytes();
        let b = submitted.trim().as_bytes();
        a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

// never print the code itself
impl fmt::Debug for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Otp(******)") }
}

/// Rounds a currency amount up to whole units.
pub fn ceil_units(amount: Decimal) -> i64 { amount.ceil().to_i64().unwrap_or(i64::MAX) }

/// Rounds a currency amount down to whole units.
pub fn floor_units(amount: Decimal) -> i64 { amount.floor().to_i64().unwrap_or(0) }
