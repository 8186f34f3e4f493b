//! House of Intimacy storefront library.
//!
//! The JSON API behind the shop: accounts, address books, the product
//! catalog, the order lifecycle and its notification emails. Exposed as a
//! library so the binary, the CLI and the integration tests share one
//! implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
