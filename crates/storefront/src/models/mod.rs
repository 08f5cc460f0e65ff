//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the `sqlx` row types in
//! [`crate::db`]. Models that are returned from the JSON API serialize with
//! camelCase field names.

pub mod order;
pub mod product;
pub mod round;
pub mod session;
pub mod shop;
pub mod user;

pub use order::{Order, OrderItem};
pub use product::{Product, ProductOption};
pub use round::Round;
pub use session::{CurrentUser, keys as session_keys};
pub use shop::{PaymentInfo, Shop};
pub use user::User;
