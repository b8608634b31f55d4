//! Application services composing the domain with repositories and gateways.
pub mod checkout;
pub mod events;
pub mod fulfillment;
pub mod notifier;
pub mod payment;
pub mod stock;

pub use checkout::{CheckoutPreview, CheckoutService};
pub use events::{EventPublisher, LogPublisher, NatsPublisher};
pub use fulfillment::{FulfillmentService, OtpDispatch, CASH_ON_DELIVERY};
pub use notifier::{HttpSmsGateway, LogSmsGateway, SmsGateway};
pub use payment::{IntentDetails, IntentStatus, PaymentGateway, PaymentIntent, StripeGateway};
pub use stock::{StockDirection, StockLedger};
