//! Order error types.

use thiserror::Error;

use hoi_core::{OrderStatus, ParseEnumError, ProductId};

use crate::db::RepositoryError;
use crate::models::MissingField;

/// Errors that can occur in the order lifecycle.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("No items in order")]
    EmptyItems,

    #[error("Shipping address is incomplete: {0}")]
    IncompleteAddress(#[from] MissingField),

    #[error("Shipping address is required")]
    MissingAddress,

    #[error("Payment method is required")]
    MissingPaymentMethod,

    /// A closed enumeration in the request had an unknown value.
    #[error("{0}")]
    InvalidEnum(#[from] ParseEnumError),

    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Every referenced product that does not exist.
    #[error("Product not found: {}", join_ids(.0))]
    UnknownProducts(Vec<ProductId>),

    #[error("Order not found")]
    NotFound,

    #[error("Not allowed")]
    Forbidden,

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Order cannot be cancelled once it is {}", .0.label())]
    NotCancellable(OrderStatus),

    #[error("Cancellation already requested for this order")]
    AlreadyRequested,

    #[error("Cancellation reason is required")]
    MissingReason,

    #[error("Nothing to update")]
    NothingToUpdate,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
