//! Core types for the storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod pincode;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, OrderTotals, shipping_fee};
pub use pincode::{cod_allowed, cod_message};
pub use status::*;
