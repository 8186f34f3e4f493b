//! Domain models for the storefront.
//!
//! These are validated domain objects. Database row types live next to the
//! repositories in [`crate::db`] and convert into these.

pub mod address;
pub mod order;
pub mod product;
pub mod user;

pub use address::{AddressInput, MissingField, PostalAddress, SavedAddress};
pub use order::{NewOrder, Order, OrderCustomer, OrderItem};
pub use product::{Product, ProductAttributes, ProductDetails, ProductPrice, Seo, SizeStock};
pub use user::{AuthUser, NewUser, PendingUser, User, UserProfile};
