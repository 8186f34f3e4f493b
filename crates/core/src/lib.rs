//! House of Intimacy Core - Shared domain types.
//!
//! This crate provides the types used across all storefront components:
//! - `storefront` - JSON API for customers and admins
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database access,
//! no HTTP clients. Pricing and pincode rules live here so they can be checked
//! without a running service.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, lifecycle enums, money rules and pincodes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
