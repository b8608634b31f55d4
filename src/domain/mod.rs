//! Domain layer: aggregates, value objects, the order lifecycle and pricing rules.
pub mod aggregates;
pub mod events;
pub mod lifecycle;
pub mod pricing;
pub mod value_objects;
