//! Stock ledger: keeps product quantities consistent with order lines.

use std::sync::Arc;

use crate::domain::aggregates::Order;
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::repository::{ProductRepository, StockDelta};
use crate::services::events::EventPublisher;
use crate::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockDirection { Subtract, Add }

#[derive(Clone)]
pub struct StockLedger {
    products: Arc<dyn ProductRepository>,
    events: Arc<dyn EventPublisher>,
}

impl StockLedger {
    pub fn new(products: Arc<dyn ProductRepository>, events: Arc<dyn EventPublisher>) -> Self { Self { products, events } }

    pub fn deltas_for(order: &Order, direction: StockDirection) -> Vec<StockDelta> {
        let sign = match direction { StockDirection::Subtract => -1, StockDirection::Add => 1 };
        order.ordered_items().iter().map(|i| StockDelta { product_id: i.product_id, delta: sign * i.product_quantity }).collect()
    }

    /// Applies the whole order's stock change atomically.
    pub async fn adjust_for_order(&self, order: &Order, direction: StockDirection) -> Result<()> {
        let deltas = Self::deltas_for(order, direction);
        if let Err(e) = self.products.apply_stock_deltas(&deltas).await {
            tracing::error!(order_id = %order.id(), ?direction, error = %e, "stock adjustment failed, nothing applied");
            return Err(e);
        }
        tracing::info!(order_id = %order.id(), ?direction, lines = deltas.len(), "stock adjusted");
        let events = deltas.iter()
            .map(|d| DomainEvent::Product(ProductEvent::StockAdjusted { product_id: d.product_id, delta: d.delta }))
            .collect();
        self.events.publish_all(events).await;
        Ok(())
    }
}
