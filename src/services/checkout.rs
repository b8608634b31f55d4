//! Checkout orchestration: order placement, previews and cancellation.
//!
//! Placement runs in a fixed order: price the checked cart, reserve the
//! discount (coin debit or coupon usage), insert the order, reserve stock,
//! then clear the ordered cart lines. Every step before the insert is either
//! side-effect free or reversed on failure; a failed stock reservation voids
//! the freshly inserted order instead of leaving it half-applied.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Coupon, Order, OrderError, OrderedItem, Profile};
use crate::domain::pricing::{
    checked_lines, checked_subtotal, coin_discount, coupon_discount, courier_charge, AppliedDiscount, DiscountSelector,
    PricedLine, PricingError, Quote,
};
use crate::repository::Repositories;
use crate::services::events::EventPublisher;
use crate::services::stock::{StockDirection, StockLedger};
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPreview {
    pub items: Vec<OrderedItem>,
    #[serde(flatten)]
    pub quote: Quote,
    /// Coupon code, `"coin"`, or `"N/A"`.
    pub discount_source: String,
    pub coin_balance: i64,
}

struct Draft {
    profile: Profile,
    lines: Vec<PricedLine>,
    quote: Quote,
    discount: AppliedDiscount,
    coupon: Option<Coupon>,
}

impl Draft {
    fn preview(self) -> CheckoutPreview {
        let discount_source = match &self.discount {
            AppliedDiscount::None => crate::domain::aggregates::NO_COUPON.to_string(),
            AppliedDiscount::Coin { .. } => "coin".to_string(),
            AppliedDiscount::Coupon { code, .. } => code.clone(),
        };
        CheckoutPreview {
            items: self.lines.iter().map(PricedLine::to_ordered_item).collect(),
            quote: self.quote, discount_source, coin_balance: self.profile.coin,
        }
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    repos: Repositories,
    stock: StockLedger,
    events: Arc<dyn EventPublisher>,
}

impl CheckoutService {
    pub fn new(repos: Repositories, events: Arc<dyn EventPublisher>) -> Self {
        let stock = StockLedger::new(repos.products.clone(), events.clone());
        Self { repos, stock, events }
    }

    pub async fn preview(&self, caller: &str, email: &str, selector: &DiscountSelector) -> Result<CheckoutPreview> {
        Ok(self.draft(caller, email, selector).await?.preview())
    }

    pub async fn coupon_preview(&self, caller: &str, email: &str, code: &str) -> Result<CheckoutPreview> {
        self.preview(caller, email, &DiscountSelector::Coupon(code.trim().to_string())).await
    }

    pub async fn coin_preview(&self, caller: &str, email: &str) -> Result<CheckoutPreview> {
        self.preview(caller, email, &DiscountSelector::Coin).await
    }

    pub async fn place_order(&self, caller: &str, email: &str, selector: &DiscountSelector) -> Result<Order> {
        let draft = self.draft(caller, email, selector).await?;
        self.reserve_discount(&draft).await?;

        let items = draft.lines.iter().map(PricedLine::to_ordered_item).collect();
        let mut order = match Order::place(&draft.profile, items, draft.quote, &draft.discount) {
            Ok(order) => order,
            Err(e) => { self.release_discount(&draft).await; return Err(e.into()); }
        };
        if let Err(e) = self.repos.orders.insert(&order).await {
            tracing::error!(email, error = %e, "order insert failed");
            self.release_discount(&draft).await;
            return Err(e);
        }

        if let Err(e) = self.stock.adjust_for_order(&order, StockDirection::Subtract).await {
            self.void(order, &draft).await;
            return Err(e);
        }

        let ordered: Vec<Uuid> = order.ordered_items().iter().map(|i| i.product_id).collect();
        if let Err(e) = self.repos.carts.remove_checked(email, &ordered).await {
            tracing::warn!(order_id = %order.id(), email, error = %e, "failed to clear ordered cart lines");
        }

        self.events.publish_all(order.take_events()).await;
        tracing::info!(order_id = %order.id(), email, final_amount = order.final_amount(), "order placed");
        Ok(order)
    }

    /// Cancels a non-terminal order and puts its stock back. Coins and coupon
    /// usage granted at checkout stay consumed.
    ///
    /// Stock is restored before the cancelled stage is written. If the write
    /// loses, the restock is taken back and the order stays active, so a retry
    /// never restocks twice and a failed restock never strands a cancelled order.
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order> {
        let mut order = self.repos.orders.get(order_id).await?.ok_or_else(|| EcommerceError::not_found("Order not found"))?;
        order.cancel()?;
        let events = order.take_events();
        self.stock.adjust_for_order(&order, StockDirection::Add).await?;
        let order = match self.repos.orders.replace(&order).await {
            Ok(order) => order,
            Err(e) => {
                if let Err(re) = self.stock.adjust_for_order(&order, StockDirection::Subtract).await {
                    tracing::error!(%order_id, error = %re, "failed to take back restock after cancel write failed");
                }
                return Err(e);
            }
        };
        self.events.publish_all(events).await;
        tracing::info!(order_id = %order.id(), email = order.user_email(), "order cancelled");
        Ok(order)
    }

    async fn draft(&self, caller: &str, email: &str, selector: &DiscountSelector) -> Result<Draft> {
        if caller != email {
            return Err(EcommerceError::Unauthorized("unauthorized".into()));
        }
        let profile = self.repos.profiles.get(email).await?.ok_or_else(|| EcommerceError::not_found("Profile not found"))?;

        let cart = self.repos.carts.get(email).await?;
        let ids: Vec<Uuid> = cart.checked_items().map(|i| i.product_id).collect();
        let catalog = self.repos.products.get_many(&ids).await?;
        let lines = checked_lines(&cart, &catalog);
        if lines.is_empty() {
            return Err(OrderError::NoItems.into());
        }

        let sub_total = checked_subtotal(&lines)?;
        let rule = self.repos.delivery_charges.get(&profile.city).await?
            .ok_or_else(|| EcommerceError::not_found(format!("No delivery charge set for {}", profile.city)))?;
        let courier = courier_charge(&rule, sub_total);

        let (discount, coupon) = match selector {
            DiscountSelector::None => (AppliedDiscount::None, None),
            DiscountSelector::Coin => (AppliedDiscount::Coin { amount: coin_discount(profile.coin, sub_total + courier)? }, None),
            DiscountSelector::Coupon(code) => {
                let coupon = self.repos.coupons.get(code).await?.ok_or_else(|| EcommerceError::not_found("Coupon not found"))?;
                let amount = coupon_discount(&coupon, &profile.coupon, sub_total, Utc::now())?;
                (AppliedDiscount::Coupon { code: code.clone(), amount }, Some(coupon))
            }
        };

        let quote = Quote::new(sub_total, courier, discount.amount());
        Ok(Draft { profile, lines, quote, discount, coupon })
    }

    async fn reserve_discount(&self, draft: &Draft) -> Result<()> {
        let email = draft.profile.email.as_str();
        match (&draft.discount, &draft.coupon) {
            (AppliedDiscount::Coin { amount }, _) => {
                if !self.repos.profiles.debit_coins(email, *amount).await? {
                    return Err(PricingError::NotEnoughCoin.into());
                }
            }
            (AppliedDiscount::Coupon { code, .. }, Some(coupon)) => {
                if !self.repos.profiles.record_coupon_use(email, code, coupon.number_of_use).await? {
                    return Err(PricingError::MaximumTimeUsed.into());
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn release_discount(&self, draft: &Draft) {
        let email = draft.profile.email.as_str();
        let result = match &draft.discount {
            AppliedDiscount::Coin { amount } => self.repos.profiles.credit_coins(email, *amount).await,
            AppliedDiscount::Coupon { code, .. } => self.repos.profiles.release_coupon_use(email, code).await,
            AppliedDiscount::None => Ok(()),
        };
        if let Err(e) = result {
            tracing::error!(email, error = %e, "failed to release checkout discount");
        }
    }

    async fn void(&self, mut order: Order, draft: &Draft) {
        tracing::error!(order_id = %order.id(), "stock reservation failed, voiding order");
        if order.cancel().is_ok() {
            order.take_events();
            if let Err(e) = self.repos.orders.replace(&order).await {
                tracing::error!(order_id = %order.id(), error = %e, "failed to void order");
            }
        }
        self.release_discount(draft).await;
    }
}
