//! Order fulfillment stages and the transition table that governs them.
//!
//! Stages progress linearly from `Payment Pending` to `Delivered`, with one
//! admin correction edge from `Processed And Ready to Ship` back to
//! `Processing`. Cancellation is not a stage: it is a terminal flag on the
//! order and is checked by the aggregate, not here.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStage {
    #[serde(rename = "Payment Pending")]
    PaymentPending,
    #[serde(rename = "Processing")]
    Processing,
    #[serde(rename = "Processed And Ready to Ship")]
    ProcessedAndReadyToShip,
    #[serde(rename = "Shipped")]
    Shipped,
    #[serde(rename = "Ready To Delivery")]
    ReadyToDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
}

impl OrderStage {
    pub const ALL: [OrderStage; 6] = [
        Self::PaymentPending, Self::Processing, Self::ProcessedAndReadyToShip,
        Self::Shipped, Self::ReadyToDelivery, Self::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentPending => "Payment Pending",
            Self::Processing => "Processing",
            Self::ProcessedAndReadyToShip => "Processed And Ready to Ship",
            Self::Shipped => "Shipped",
            Self::ReadyToDelivery => "Ready To Delivery",
            Self::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    ConfirmPayment,
    MarkProcessed,
    RevertToProcessing,
    Ship,
    MarkReadyToDeliver,
    Deliver,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConfirmPayment => "confirm payment",
            Self::MarkProcessed => "mark processed",
            Self::RevertToProcessing => "revert to processing",
            Self::Ship => "ship",
            Self::MarkReadyToDeliver => "mark ready to deliver",
            Self::Deliver => "deliver",
        };
        f.write_str(s)
    }
}

use OrderStage::*;

const TRANSITIONS: &[(OrderStage, Transition, OrderStage)] = &[
    (PaymentPending, Transition::ConfirmPayment, Processing),
    (Processing, Transition::MarkProcessed, ProcessedAndReadyToShip),
    (ProcessedAndReadyToShip, Transition::RevertToProcessing, Processing),
    (ProcessedAndReadyToShip, Transition::Ship, Shipped),
    (Shipped, Transition::MarkReadyToDeliver, ReadyToDelivery),
    (ReadyToDelivery, Transition::Deliver, Delivered),
];

/// Looks up the stage reached by applying `transition` in `from`.
pub fn next_stage(from: OrderStage, transition: Transition) -> Option<OrderStage> {
    TRANSITIONS.iter().find(|(f, t, _)| *f == from && *t == transition).map(|(_, _, to)| *to)
}
