//! Domain events
use crate::domain::lifecycle::OrderStage;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

impl DomainEvent {
    /// Subject the event is published under on the message bus.
    pub fn subject(&self) -> String {
        match self {
            Self::Product(ProductEvent::StockAdjusted { .. }) => "emart.product.stock_adjusted".into(),
            Self::Order(e) => format!("emart.order.{}", e.name()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ProductEvent {
    StockAdjusted { product_id: Uuid, delta: i64 },
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_email: String, final_amount: i64 },
    StageChanged { order_id: Uuid, stage: OrderStage },
    Delivered { order_id: Uuid, coins_earned: i64 },
    Cancelled { order_id: Uuid },
}

impl OrderEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Placed { .. } => "placed",
            Self::StageChanged { .. } => "stage_changed",
            Self::Delivered { .. } => "delivered",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}
