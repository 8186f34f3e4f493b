//! Closed enumerations for orders, payments, users and products.
//!
//! Every enum here parses from its wire spelling via `FromStr` so request
//! handlers can reject unknown values with a 400 instead of a deserializer
//! rejection. With the `postgres` feature they map to the matching Postgres
//! enum types created by the storefront migrations.

use serde::{Deserialize, Serialize};

/// A value did not match any variant of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    /// Human readable name of the enumeration.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire spelling used in JSON and the database.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Order lifecycle status.
///
/// `Cancelled` is absorbing for the cancellation flow. Admins may otherwise
/// move an order between any two statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Placed,
    Confirmed,
    Processing,
    Shipped,
    OutForDelivery,
    Delivered,
    Cancelled,
}

wire_enum!(OrderStatus, "order status", {
    Placed => "PLACED",
    Confirmed => "CONFIRMED",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    OutForDelivery => "OUT_FOR_DELIVERY",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

impl OrderStatus {
    /// Whether a customer may still ask to cancel an order in this status.
    #[must_use]
    pub const fn accepts_cancel_request(&self) -> bool {
        matches!(self, Self::Placed | Self::Confirmed | Self::Processing)
    }

    /// Status label with underscores replaced by spaces, e.g. `OUT FOR DELIVERY`.
    #[must_use]
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

/// Payment settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

wire_enum!(PaymentStatus, "payment status", {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Cash on delivery. Settles when the parcel is delivered.
    Cod,
    /// Prepaid through the payment gateway.
    Online,
}

wire_enum!(PaymentMethod, "payment method", {
    Cod => "COD",
    Online => "ONLINE",
});

impl PaymentMethod {
    /// Payment status an order falls back to when an admin cancels it.
    ///
    /// Prepaid orders are refunded. COD orders were never collected.
    #[must_use]
    pub const fn status_after_cancellation(&self) -> PaymentStatus {
        match self {
            Self::Online => PaymentStatus::Refunded,
            Self::Cod => PaymentStatus::Pending,
        }
    }
}

/// Account role carried in access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

wire_enum!(Role, "role", {
    User => "user",
    Admin => "admin",
});

/// Catalog visibility status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_status", rename_all = "kebab-case")
)]
#[serde(rename_all = "kebab-case")]
pub enum ProductStatus {
    #[default]
    Active,
    Draft,
    OutOfStock,
    Archived,
}

wire_enum!(ProductStatus, "product status", {
    Active => "active",
    Draft => "draft",
    OutOfStock => "out-of-stock",
    Archived => "archived",
});

/// Target audience of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "product_gender", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Women,
    Men,
    Unisex,
}

wire_enum!(Gender, "gender", {
    Women => "women",
    Men => "men",
    Unisex => "unisex",
});

/// Label attached to a saved address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    #[default]
    Home,
    Work,
    Other,
}

wire_enum!(AddressType, "address type", {
    Home => "home",
    Work => "work",
    Other => "other",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_names_match_serde() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_order_status_rejects_unknown() {
        let err = "RETURNED".parse::<OrderStatus>().unwrap_err();
        assert_eq!(err.kind, "order status");
        assert_eq!(err.value, "RETURNED");
        assert!("placed".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_cancel_request_window() {
        let open: Vec<_> = OrderStatus::ALL
            .iter()
            .filter(|s| s.accepts_cancel_request())
            .copied()
            .collect();
        assert_eq!(
            open,
            vec![
                OrderStatus::Placed,
                OrderStatus::Confirmed,
                OrderStatus::Processing
            ]
        );
    }

    #[test]
    fn test_status_label() {
        assert_eq!(OrderStatus::OutForDelivery.label(), "OUT FOR DELIVERY");
        assert_eq!(OrderStatus::Placed.label(), "PLACED");
    }

    #[test]
    fn test_payment_after_cancellation() {
        assert_eq!(
            PaymentMethod::Online.status_after_cancellation(),
            PaymentStatus::Refunded
        );
        assert_eq!(
            PaymentMethod::Cod.status_after_cancellation(),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_product_status_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::OutOfStock).unwrap(),
            "\"out-of-stock\""
        );
        assert_eq!(
            "out-of-stock".parse::<ProductStatus>().unwrap(),
            ProductStatus::OutOfStock
        );
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Gender::default(), Gender::Women);
        assert_eq!(AddressType::default(), AddressType::Home);
        assert_eq!(Role::default(), Role::User);
    }
}
