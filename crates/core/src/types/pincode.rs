//! Cash-on-delivery serviceability by Indian postal code.
//!
//! COD is offered only inside the Dehradun area: six ASCII digits starting
//! with `248`.

/// Postal prefix of the COD serviceable area.
pub const COD_PINCODE_PREFIX: &str = "248";

/// Whether cash on delivery is allowed for a pincode.
///
/// Surrounding whitespace is ignored.
#[must_use]
pub fn cod_allowed(pin: &str) -> bool {
    let pin = pin.trim();
    pin.len() == 6 && pin.bytes().all(|b| b.is_ascii_digit()) && pin.starts_with(COD_PINCODE_PREFIX)
}

/// Customer-facing explanation for a COD check result.
#[must_use]
pub const fn cod_message(allowed: bool) -> &'static str {
    if allowed {
        "COD is available for this Dehradun pincode."
    } else {
        "COD is available only within Dehradun serviceable pincodes."
    }
}
