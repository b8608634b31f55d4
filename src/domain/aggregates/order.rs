//! Order Aggregate
//!
//! An order is a frozen snapshot of the purchaser and the checked cart lines
//! taken at checkout, plus an append-only log of fulfillment stages. The
//! current stage is the last log entry; `status` separately flags the two
//! terminal outcomes, after which every transition is refused.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Profile;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::lifecycle::{next_stage, OrderStage, Transition};
use crate::domain::pricing::{AppliedDiscount, Quote};
use crate::domain::value_objects::Otp;

pub const NO_COUPON: &str = "N/A";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    user_email: String,
    user_name: String,
    user_address: String,
    user_city: String,
    user_phone: Option<String>,
    ordered_items: Vec<OrderedItem>,
    sub_total_amount: i64,
    discounted_amount: i64,
    courier_charge: i64,
    final_amount: i64,
    coupon: String,
    coin_used: i64,
    order_status: Vec<StatusEntry>,
    status: OrderStatus,
    delivery_partner: Option<DeliveryPartner>,
    payment: Option<PaymentInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    otp: Option<Otp>,
    #[serde(skip)]
    version: i64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedItem { pub product_id: Uuid, pub product_name: String, pub product_price: Decimal, pub product_quantity: i64, pub product_image: String }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry { pub name: OrderStage, pub message: String, pub time: DateTime<Utc> }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPartner { pub email: String, pub name: String, pub phone: Option<String> }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfo { pub method: String, pub transaction_id: Option<String> }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Active, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "Active", Self::Delivered => "Delivered", Self::Cancelled => "Cancelled" }
    }
    pub fn parse(s: &str) -> Option<Self> {
        match s { "Active" => Some(Self::Active), "Delivered" => Some(Self::Delivered), "Cancelled" => Some(Self::Cancelled), _ => None }
    }
    pub fn is_terminal(&self) -> bool { !matches!(self, Self::Active) }
}

impl Order {
    pub fn place(purchaser: &Profile, items: Vec<OrderedItem>, quote: Quote, discount: &AppliedDiscount) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        let now = Utc::now();
        let id = Uuid::now_v7();
        let (coupon, coin_used) = match discount {
            AppliedDiscount::Coupon { code, .. } => (code.clone(), 0),
            AppliedDiscount::Coin { amount } => (NO_COUPON.to_string(), *amount),
            AppliedDiscount::None => (NO_COUPON.to_string(), 0),
        };
        let mut order = Self {
            id, user_email: purchaser.email.clone(), user_name: purchaser.name.clone(),
            user_address: purchaser.address.clone(), user_city: purchaser.city.clone(), user_phone: purchaser.phone.clone(),
            ordered_items: items, sub_total_amount: quote.sub_total, discounted_amount: quote.discount,
            courier_charge: quote.courier_charge, final_amount: quote.final_amount, coupon, coin_used,
            order_status: vec![StatusEntry { name: OrderStage::PaymentPending, message: "Order placed, waiting for payment".into(), time: now }],
            status: OrderStatus::Active, delivery_partner: None, payment: None,
            created_at: now, updated_at: now, otp: None, version: 0, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: id, user_email: order.user_email.clone(), final_amount: order.final_amount }));
        Ok(order)
    }

    /// Reattaches the fields that are stored outside the order document.
    pub(crate) fn with_storage_fields(mut self, otp: Option<String>, version: i64) -> Self {
        self.otp = otp.map(Otp::from_stored);
        self.version = version;
        self
    }

    pub(crate) fn set_version(&mut self, version: i64) { self.version = version; }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_email(&self) -> &str { &self.user_email }
    pub fn user_phone(&self) -> Option<&str> { self.user_phone.as_deref() }
    pub fn ordered_items(&self) -> &[OrderedItem] { &self.ordered_items }
    pub fn sub_total_amount(&self) -> i64 { self.sub_total_amount }
    pub fn discounted_amount(&self) -> i64 { self.discounted_amount }
    pub fn courier_charge(&self) -> i64 { self.courier_charge }
    pub fn final_amount(&self) -> i64 { self.final_amount }
    pub fn coupon(&self) -> &str { &self.coupon }
    pub fn coin_used(&self) -> i64 { self.coin_used }
    pub fn order_status(&self) -> &[StatusEntry] { &self.order_status }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn delivery_partner(&self) -> Option<&DeliveryPartner> { self.delivery_partner.as_ref() }
    pub fn payment(&self) -> Option<&PaymentInfo> { self.payment.as_ref() }
    pub fn otp(&self) -> Option<&Otp> { self.otp.as_ref() }
    pub fn version(&self) -> i64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }

    pub fn current_stage(&self) -> OrderStage {
        self.order_status.last().map(|e| e.name).unwrap_or(OrderStage::PaymentPending)
    }

    pub fn is_terminal(&self) -> bool { self.status.is_terminal() }

    pub fn is_assigned_to(&self, email: &str) -> bool {
        self.delivery_partner.as_ref().is_some_and(|p| p.email == email)
    }

    /// Loyalty coins earned once this order is delivered.
    pub fn loyalty_coins(&self) -> i64 { (self.final_amount / 100).max(0) }

    pub fn confirm_payment(&mut self, payment: PaymentInfo) -> Result<(), OrderError> {
        let to = self.check(Transition::ConfirmPayment)?;
        let message = format!("Payment received via {}", payment.method);
        self.payment = Some(payment);
        self.record(Transition::ConfirmPayment, to, message);
        Ok(())
    }

    pub fn mark_processed(&mut self) -> Result<(), OrderError> {
        let to = self.check(Transition::MarkProcessed)?;
        self.record(Transition::MarkProcessed, to, "Your order has been processed and is ready to ship".into());
        Ok(())
    }

    pub fn revert_to_processing(&mut self) -> Result<(), OrderError> {
        let to = self.check(Transition::RevertToProcessing)?;
        self.record(Transition::RevertToProcessing, to, String::new());
        Ok(())
    }

    pub fn ship(&mut self, partner: DeliveryPartner) -> Result<(), OrderError> {
        let to = self.check(Transition::Ship)?;
        let message = format!("Handed over to delivery partner {}", partner.name);
        self.delivery_partner = Some(partner);
        self.record(Transition::Ship, to, message);
        Ok(())
    }

    pub fn mark_ready_for_delivery(&mut self, otp: Otp) -> Result<(), OrderError> {
        let to = self.check(Transition::MarkReadyToDeliver)?;
        if self.user_phone.as_deref().map_or(true, |p| p.trim().is_empty()) { return Err(OrderError::MissingPhone); }
        self.otp = Some(otp);
        self.record(Transition::MarkReadyToDeliver, to, "Your order is out for delivery".into());
        Ok(())
    }

    /// Confirms delivery against the stored OTP and returns the coins earned.
    pub fn deliver(&mut self, submitted_otp: &str) -> Result<i64, OrderError> {
        let to = self.check(Transition::Deliver)?;
        if !self.otp.as_ref().is_some_and(|otp| otp.matches(submitted_otp)) { return Err(OrderError::WrongOtp); }
        self.record(Transition::Deliver, to, "Your order has been delivered".into());
        self.status = OrderStatus::Delivered;
        let coins = self.loyalty_coins();
        self.raise_event(DomainEvent::Order(OrderEvent::Delivered { order_id: self.id, coins_earned: coins }));
        Ok(coins)
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if self.status.is_terminal() { return Err(OrderError::Terminal(self.status)); }
        self.status = OrderStatus::Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id }));
        Ok(())
    }

    fn check(&self, transition: Transition) -> Result<OrderStage, OrderError> {
        if self.status.is_terminal() { return Err(OrderError::Terminal(self.status)); }
        let from = self.current_stage();
        next_stage(from, transition).ok_or(OrderError::InvalidTransition { from, transition })
    }

    fn record(&mut self, transition: Transition, to: OrderStage, message: String) {
        if transition == Transition::RevertToProcessing {
            self.order_status.pop();
        } else {
            self.order_status.push(StatusEntry { name: to, message, time: Utc::now() });
        }
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StageChanged { order_id: self.id, stage: to }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderError {
    NoItems,
    Terminal(OrderStatus),
    InvalidTransition { from: OrderStage, transition: Transition },
    MissingPhone,
    WrongOtp,
}
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No checked items in stock"),
            Self::Terminal(status) => write!(f, "Order is already {}", status.as_str()),
            Self::InvalidTransition { from, transition } => write!(f, "Cannot {transition} an order in stage {from}"),
            Self::MissingPhone => write!(f, "Order has no phone number"),
            Self::WrongOtp => write!(f, "Wrong OTP"),
        }
    }
}
