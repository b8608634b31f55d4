//! Aggregates module
pub mod cart;
pub mod coupon;
pub mod delivery;
pub mod order;
pub mod product;
pub mod profile;
pub mod wishlist;

pub use cart::{Cart, CartError, CartItem};
pub use coupon::Coupon;
pub use delivery::DeliveryChargeRule;
pub use order::{DeliveryPartner, Order, OrderError, OrderStatus, OrderedItem, PaymentInfo, StatusEntry, NO_COUPON};
pub use product::Product;
pub use profile::{Profile, Role};
pub use wishlist::{Wishlist, WishlistItem};
