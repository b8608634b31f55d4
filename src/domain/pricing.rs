//! Pricing rules for checkout: subtotal, courier charge and discounts.
//!
//! All amounts leaving this module are whole currency units. Prices are
//! summed as decimals and rounded up once at the subtotal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

use crate::domain::aggregates::{Cart, Coupon, DeliveryChargeRule, OrderedItem, Product};
use crate::domain::value_objects::ceil_units;

/// Coin balance required before coins can be redeemed.
pub const MIN_REDEEMABLE_COIN: i64 = 100;

/// Largest subtotal an order may carry, in whole units.
pub const MAX_ORDER_TOTAL: i64 = 1_000_000_000_000;

#[derive(Clone, Debug)]
pub struct PricedLine { pub product: Product, pub quantity: i64 }

impl PricedLine {
    /// `None` when price times quantity does not fit a decimal.
    pub fn line_total(&self) -> Option<Decimal> { self.product.price.checked_mul(Decimal::from(self.quantity)) }

    pub fn to_ordered_item(&self) -> OrderedItem {
        OrderedItem {
            product_id: self.product.id, product_name: self.product.name.clone(), product_price: self.product.price,
            product_quantity: self.quantity, product_image: self.product.image.clone(),
        }
    }
}

/// Joins checked cart lines with live catalog data, clamping each quantity
/// to current stock. Lines whose product is gone or sold out are dropped.
pub fn checked_lines(cart: &Cart, catalog: &[Product]) -> Vec<PricedLine> {
    cart.checked_items()
        .filter_map(|item| {
            let product = catalog.iter().find(|p| p.id == item.product_id)?;
            let quantity = product.sellable(item.quantity);
            (quantity > 0).then(|| PricedLine { product: product.clone(), quantity })
        })
        .collect()
}

pub fn checked_subtotal(lines: &[PricedLine]) -> Result<i64, PricingError> {
    let total = lines.iter()
        .try_fold(Decimal::ZERO, |acc, line| line.line_total().and_then(|t| acc.checked_add(t)))
        .ok_or(PricingError::AmountTooLarge)?;
    if total > Decimal::from(MAX_ORDER_TOTAL) {
        return Err(PricingError::AmountTooLarge);
    }
    Ok(ceil_units(total))
}

pub fn courier_charge(rule: &DeliveryChargeRule, subtotal: i64) -> i64 {
    if subtotal >= rule.minimum_order_limit { rule.discounted_delivery_charge } else { rule.default_delivery_charge }
}

pub fn coupon_discount(coupon: &Coupon, history: &[String], subtotal: i64, now: DateTime<Utc>) -> Result<i64, PricingError> {
    if !coupon.is_running_at(now) { return Err(PricingError::CampaignTimeOver); }
    if coupon.is_exhausted_for(history) { return Err(PricingError::MaximumTimeUsed); }
    Ok(coupon.discount_for(subtotal))
}

pub fn coin_discount(coin_balance: i64, amount_due: i64) -> Result<i64, PricingError> {
    if coin_balance < MIN_REDEEMABLE_COIN { return Err(PricingError::NotEnoughCoin); }
    Ok(coin_balance.min(amount_due).max(0))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub sub_total: i64,
    pub courier_charge: i64,
    pub discount: i64,
    pub final_amount: i64,
}

impl Quote {
    pub fn new(sub_total: i64, courier_charge: i64, discount: i64) -> Self {
        let discount = discount.clamp(0, sub_total + courier_charge);
        Self { sub_total, courier_charge, discount, final_amount: sub_total + courier_charge - discount }
    }
}

/// Which discount the caller asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscountSelector { None, Coin, Coupon(String) }

impl DiscountSelector {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::None,
            Some(s) if s.eq_ignore_ascii_case("coin") => Self::Coin,
            Some(code) => Self::Coupon(code.to_string()),
        }
    }
}

/// The discount that was actually granted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppliedDiscount { None, Coupon { code: String, amount: i64 }, Coin { amount: i64 } }

impl AppliedDiscount {
    pub fn amount(&self) -> i64 {
        match self { Self::None => 0, Self::Coupon { amount, .. } | Self::Coin { amount } => *amount }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError { CampaignTimeOver, MaximumTimeUsed, NotEnoughCoin, AmountTooLarge }
impl std::error::Error for PricingError {}
impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CampaignTimeOver => write!(f, "Campaign Time Over"),
            Self::MaximumTimeUsed => write!(f, "Maximum time used"),
            Self::NotEnoughCoin => write!(f, "Not enough coin"),
            Self::AmountTooLarge => write!(f, "Order amount is too large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::rstest;

    fn rule() -> DeliveryChargeRule {
        DeliveryChargeRule { city: "Dhaka".into(), minimum_order_limit: 1000, discounted_delivery_charge: 0, default_delivery_charge: 60 }
    }

    #[rstest]
    #[case(1200, 0)]
    #[case(1000, 0)]
    #[case(999, 60)]
    #[case(800, 60)]
    fn test_courier_charge_tiers(#[case] subtotal: i64, #[case] expected: i64) {
        assert_eq!(courier_charge(&rule(), subtotal), expected);
    }

    #[test]
    fn test_subtotal_counts_only_checked_and_clamps_stock() {
        let a = Product::create("A", Decimal::new(1050, 2), 5, "");
        let b = Product::create("B", Decimal::new(300, 0), 5, "");
        let c = Product::create("C", Decimal::new(99, 0), 1, "");
        let mut cart = Cart::new("u@x.io");
        cart.add_item(a.id, 2);
        cart.add_item(b.id, 1);
        cart.add_item(c.id, 4);
        cart.set_checked(b.id, false).unwrap();
        let lines = checked_lines(&cart, &[a.clone(), b, c]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].quantity, 1);
        // 2 × 10.50 + 1 × 99
        assert_eq!(checked_subtotal(&lines), Ok(120));
    }

    #[test]
    fn test_zero_stock_lines_are_discarded() {
        let mut sold_out = Product::create("S", Decimal::new(5, 0), 0, "");
        sold_out.adjust_stock(-3);
        let mut cart = Cart::new("u@x.io");
        cart.add_item(sold_out.id, 1);
        cart.add_item(uuid::Uuid::new_v4(), 1);
        assert!(checked_lines(&cart, &[sold_out]).is_empty());
    }

    #[test]
    fn test_subtotal_rounds_up() {
        let p = Product::create("P", Decimal::new(3333, 2), 10, "");
        let lines = vec![PricedLine { product: p, quantity: 1 }];
        assert_eq!(checked_subtotal(&lines), Ok(34));
    }

    #[test]
    fn test_coupon_window_checked_before_usage() {
        let coupon = Coupon {
            coupon_code: "OLD".into(), percentage: Decimal::new(10, 0), maximum_discount_limit: 100, number_of_use: 1,
            start_date: Utc::now() - Duration::days(10), end_date: Utc::now() - Duration::days(1),
        };
        assert_eq!(coupon_discount(&coupon, &[], 1000, Utc::now()), Err(PricingError::CampaignTimeOver));
        let history = vec!["OLD".to_string()];
        assert_eq!(coupon_discount(&coupon, &history, 1000, Utc::now()), Err(PricingError::CampaignTimeOver));
    }

    #[test]
    fn test_coupon_usage_limit() {
        let coupon = Coupon {
            coupon_code: "NEW".into(), percentage: Decimal::new(15, 0), maximum_discount_limit: 100, number_of_use: 1,
            start_date: Utc::now() - Duration::days(1), end_date: Utc::now() + Duration::days(1),
        };
        assert_eq!(coupon_discount(&coupon, &[], 500, Utc::now()), Ok(75));
        assert_eq!(coupon_discount(&coupon, &["NEW".to_string()], 500, Utc::now()), Err(PricingError::MaximumTimeUsed));
    }

    #[rstest]
    #[case(99, 500, Err(PricingError::NotEnoughCoin))]
    #[case(100, 500, Ok(100))]
    #[case(750, 500, Ok(500))]
    fn test_coin_discount(#[case] coin: i64, #[case] due: i64, #[case] expected: Result<i64, PricingError>) {
        assert_eq!(coin_discount(coin, due), expected);
    }

    #[test]
    fn test_quote_final_amount() {
        let q = Quote::new(1200, 60, 100);
        assert_eq!(q.final_amount, q.sub_total + q.courier_charge - q.discount);
        assert_eq!(q.final_amount, 1160);
        assert_eq!(Quote::new(100, 0, 500).final_amount, 0);
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!(DiscountSelector::parse(None), DiscountSelector::None);
        assert_eq!(DiscountSelector::parse(Some(" ")), DiscountSelector::None);
        assert_eq!(DiscountSelector::parse(Some("coin")), DiscountSelector::Coin);
        assert_eq!(DiscountSelector::parse(Some("EID10")), DiscountSelector::Coupon("EID10".into()));
    }

    #[test]
    fn test_oversized_line_is_rejected_instead_of_overflowing() {
        let pricey = Product::create("Yacht", Decimal::MAX, i64::MAX, "");
        let line = PricedLine { product: pricey, quantity: i64::MAX };
        assert_eq!(line.line_total(), None);
        assert_eq!(checked_subtotal(&[line]), Err(PricingError::AmountTooLarge));

        let big = Product::create("Estate", Decimal::from(MAX_ORDER_TOTAL), 2, "");
        assert_eq!(checked_subtotal(&[PricedLine { product: big, quantity: 2 }]), Err(PricingError::AmountTooLarge));
    }
}
