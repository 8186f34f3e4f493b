//! Business logic services for the storefront.
//!
//! Services borrow the store traits from [`crate::db`] and the notifier from
//! [`email`], so they run the same against Postgres and the in-memory stores
//! used in tests.
//!
//! # Services
//!
//! - `addresses` - Per-user address book with a single default
//! - `auth` - Registration, OTP verification, login tokens, password reset
//! - `catalog` - Product listing, lookups and admin forms
//! - `email` - SMTP delivery and account emails
//! - `notify` - Order event emails for customers and admins
//! - `orders` - Order creation, cancellation requests, status changes
//! - `payments` - Payment gateway webhook

pub mod addresses;
pub mod auth;
pub mod catalog;
pub mod email;
pub mod notify;
pub mod orders;
pub mod payments;
