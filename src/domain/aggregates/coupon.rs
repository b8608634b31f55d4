//! Coupon Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::floor_units;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub coupon_code: String,
    pub percentage: Decimal,
    pub maximum_discount_limit: i64,
    /// Times a single user may apply this code.
    pub number_of_use: i32,
    #[serde(rename = "start_Date")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "end_Date")]
    pub end_date: DateTime<Utc>,
}

impl Coupon {
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool { self.start_date <= now && now <= self.end_date }

    /// Count of prior applications of this code in a user's history.
    pub fn usage_in(&self, history: &[String]) -> usize { history.iter().filter(|c| **c == self.coupon_code).count() }

    pub fn is_exhausted_for(&self, history: &[String]) -> bool {
        self.usage_in(history) >= usize::try_from(self.number_of_use).unwrap_or(0)
    }

    /// `floor(subtotal × percentage / 100)`, capped at the coupon limit.
    pub fn discount_for(&self, subtotal: i64) -> i64 {
        let raw = floor_units(Decimal::from(subtotal) * self.percentage / Decimal::ONE_HUNDRED);
        raw.min(self.maximum_discount_limit).max(0)
    }
}
