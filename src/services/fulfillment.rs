//! Fulfillment: drives an order from payment through delivery.
//!
//! Each operation loads the order, applies one aggregate transition, and
//! writes it back with a version check. Role checks live here so every
//! entry point enforces the same rules.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{DeliveryPartner, Order, PaymentInfo, Profile, Role};
use crate::domain::lifecycle::OrderStage;
use crate::domain::value_objects::Otp;
use crate::repository::Repositories;
use crate::services::events::EventPublisher;
use crate::services::notifier::SmsGateway;
use crate::services::payment::{IntentStatus, PaymentGateway, PaymentIntent};
use crate::{EcommerceError, Result};

const ORDER_STAFF: &[Role] = &[Role::Admin, Role::OrderManager];

/// The only method that may be confirmed without a captured payment intent.
pub const CASH_ON_DELIVERY: &str = "Cash On Delivery";

fn not_captured() -> EcommerceError {
    EcommerceError::UnprocessableEntity("Payment has not been captured".into())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpDispatch {
    pub order: Order,
    /// Whether the SMS gateway accepted the code. When `false` the order has
    /// still advanced and the code can be resent.
    pub notified: bool,
}

#[derive(Clone)]
pub struct FulfillmentService {
    repos: Repositories,
    sms: Arc<dyn SmsGateway>,
    payments: Option<Arc<dyn PaymentGateway>>,
    events: Arc<dyn EventPublisher>,
}

fn require_role(actor: &Profile, roles: &[Role]) -> Result<()> {
    if actor.has_any_role(roles) { Ok(()) } else { Err(EcommerceError::forbidden("forbidden message")) }
}

fn require_courier_access(actor: &Profile, order: &Order) -> Result<()> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::DeliveryPartner if order.is_assigned_to(&actor.email) => Ok(()),
        _ => Err(EcommerceError::forbidden("Order is not assigned to you")),
    }
}

fn require_buyer_or_admin(actor: &Profile, order: &Order) -> Result<()> {
    if actor.role == Role::Admin || actor.email == order.user_email() { Ok(()) } else { Err(EcommerceError::Unauthorized("unauthorized".into())) }
}

impl FulfillmentService {
    pub fn new(repos: Repositories, sms: Arc<dyn SmsGateway>, payments: Option<Arc<dyn PaymentGateway>>, events: Arc<dyn EventPublisher>) -> Self {
        Self { repos, sms, payments, events }
    }

    pub async fn create_payment_intent(&self, actor: &Profile, order_id: Uuid) -> Result<PaymentIntent> {
        let order = self.load(order_id).await?;
        require_buyer_or_admin(actor, &order)?;
        if order.is_terminal() || order.current_stage() != OrderStage::PaymentPending {
            return Err(EcommerceError::conflict("Order is not awaiting payment"));
        }
        let gateway = self.payment_gateway()?;
        // minor units
        gateway.create_intent(order.final_amount() * 100, &order.id().to_string()).await
    }

    /// A card payment needs an intent the gateway reports as succeeded, created
    /// for this order and for its exact amount. Without an intent only cash on
    /// delivery is accepted, unless an admin records the payment.
    pub async fn confirm_payment(&self, actor: &Profile, order_id: Uuid, method: String, payment_intent_id: Option<String>) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        require_buyer_or_admin(actor, &order)?;
        match &payment_intent_id {
            Some(intent_id) => self.verify_intent(&order, intent_id).await?,
            None if method.trim().eq_ignore_ascii_case(CASH_ON_DELIVERY) || actor.role == Role::Admin => {}
            None => {
                tracing::warn!(order_id = %order.id(), method = %method, "payment confirmation without an intent rejected");
                return Err(not_captured());
            }
        }
        order.confirm_payment(PaymentInfo { method, transaction_id: payment_intent_id })?;
        self.commit(order).await
    }

    pub async fn mark_processed(&self, actor: &Profile, order_id: Uuid) -> Result<Order> {
        require_role(actor, ORDER_STAFF)?;
        let mut order = self.load(order_id).await?;
        order.mark_processed()?;
        self.commit(order).await
    }

    pub async fn revert_to_processing(&self, actor: &Profile, order_id: Uuid) -> Result<Order> {
        require_role(actor, ORDER_STAFF)?;
        let mut order = self.load(order_id).await?;
        order.revert_to_processing()?;
        self.commit(order).await
    }

    pub async fn ship(&self, actor: &Profile, order_id: Uuid, partner_email: &str) -> Result<Order> {
        require_role(actor, ORDER_STAFF)?;
        let partner = self.repos.profiles.get(partner_email).await?
            .ok_or_else(|| EcommerceError::not_found("Delivery partner not found"))?;
        if partner.role != Role::DeliveryPartner {
            return Err(EcommerceError::forbidden(format!("{} is not a Delivery Partner", partner.email)));
        }
        let mut order = self.load(order_id).await?;
        order.ship(DeliveryPartner { email: partner.email, name: partner.name, phone: partner.phone })?;
        self.commit(order).await
    }

    /// Moves the order to "Ready To Delivery" with a fresh OTP, then tries to
    /// text it to the purchaser. The transition is committed either way.
    pub async fn issue_delivery_otp(&self, actor: &Profile, order_id: Uuid) -> Result<OtpDispatch> {
        let mut order = self.load(order_id).await?;
        require_courier_access(actor, &order)?;
        order.mark_ready_for_delivery(Otp::generate())?;
        let order = self.commit(order).await?;
        let notified = self.dispatch_otp(&order).await;
        Ok(OtpDispatch { order, notified })
    }

    pub async fn resend_otp(&self, actor: &Profile, order_id: Uuid) -> Result<OtpDispatch> {
        let order = self.load(order_id).await?;
        require_courier_access(actor, &order)?;
        if order.is_terminal() || order.current_stage() != OrderStage::ReadyToDelivery {
            return Err(EcommerceError::conflict("Order is not waiting for delivery"));
        }
        let notified = self.dispatch_otp(&order).await;
        Ok(OtpDispatch { order, notified })
    }

    /// Coins are credited before the delivered stage is written; a failed
    /// write takes them back so a retry cannot credit twice.
    pub async fn deliver(&self, actor: &Profile, order_id: Uuid, otp: &str) -> Result<Order> {
        let mut order = self.load(order_id).await?;
        require_courier_access(actor, &order)?;
        let coins = order.deliver(otp)?;
        let email = order.user_email().to_string();
        if coins > 0 {
            self.repos.profiles.credit_coins(&email, coins).await?;
        }
        let order = match self.commit(order).await {
            Ok(order) => order,
            Err(e) => {
                if coins > 0 {
                    match self.repos.profiles.debit_coins(&email, coins).await {
                        Ok(true) => {}
                        Ok(false) => tracing::error!(%order_id, coins, "coins already spent, cannot reverse delivery credit"),
                        Err(re) => tracing::error!(%order_id, coins, error = %re, "failed to reverse delivery credit"),
                    }
                }
                return Err(e);
            }
        };
        tracing::info!(order_id = %order.id(), coins, "order delivered");
        Ok(order)
    }

    async fn dispatch_otp(&self, order: &Order) -> bool {
        let (Some(phone), Some(otp)) = (order.user_phone(), order.otp()) else { return false };
        let message = format!("Your e-mart delivery OTP is {}. Share it only after receiving order {}.", otp.as_str(), order.id());
        match self.sms.send(phone, &message).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "OTP dispatch failed, resend is possible");
                false
            }
        }
    }

    async fn verify_intent(&self, order: &Order, intent_id: &str) -> Result<()> {
        let intent = self.payment_gateway()?.retrieve_intent(intent_id).await?;
        let expected = order.final_amount() * 100;
        let for_order = intent.order_id.as_deref() == Some(order.id().to_string().as_str());
        if intent.status != IntentStatus::Succeeded || !for_order || intent.amount_minor != expected {
            tracing::warn!(
                order_id = %order.id(), intent_id, status = ?intent.status, amount = intent.amount_minor, expected,
                "payment intent does not settle this order"
            );
            return Err(not_captured());
        }
        Ok(())
    }

    fn payment_gateway(&self) -> Result<&Arc<dyn PaymentGateway>> {
        self.payments.as_ref().ok_or_else(|| EcommerceError::Internal("payment gateway not configured".into()))
    }

    async fn load(&self, order_id: Uuid) -> Result<Order> {
        self.repos.orders.get(order_id).await?.ok_or_else(|| EcommerceError::not_found("Order not found"))
    }

    async fn commit(&self, mut order: Order) -> Result<Order> {
        let events = order.take_events();
        let stored = self.repos.orders.replace(&order).await?;
        tracing::info!(order_id = %stored.id(), stage = %stored.current_stage(), "order stage changed");
        self.events.publish_all(events).await;
        Ok(stored)
    }
}
