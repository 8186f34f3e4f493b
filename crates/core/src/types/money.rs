//! Order money rules using decimal arithmetic.
//!
//! All amounts are rupees held as [`Decimal`]; nothing here rounds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Orders whose items total reaches this amount ship for free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(999, 0, 0, false, 0);

/// Shipping charged below [`FREE_SHIPPING_THRESHOLD`].
pub const FLAT_SHIPPING_FEE: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// Shipping fee for a given items total.
#[must_use]
pub fn shipping_fee(items_total: Decimal) -> Decimal {
    if items_total >= FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// Aggregated money fields of an order, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of `mrp * quantity` over all lines.
    pub mrp_total: Decimal,
    /// Sum of `sale price * quantity` over all lines.
    pub items_total: Decimal,
    /// `mrp_total - items_total`.
    pub discount_total: Decimal,
    /// Derived from `items_total` via [`shipping_fee`].
    pub shipping_fee: Decimal,
    /// `items_total + shipping_fee`.
    pub grand_total: Decimal,
}

impl OrderTotals {
    /// Compute totals from `(line_mrp_total, line_total)` pairs.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, Decimal)>,
    {
        let (mrp_total, items_total) = lines
            .into_iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(mrp, items), (m, s)| {
                (mrp + m, items + s)
            });

        let shipping_fee = shipping_fee(items_total);

        Self {
            mrp_total,
            items_total,
            discount_total: mrp_total - items_total,
            shipping_fee,
            grand_total: items_total + shipping_fee,
        }
    }

    /// Amount the customer saves against MRP.
    #[must_use]
    pub const fn total_savings(&self) -> Decimal {
        self.discount_total
    }
}
