//! Postal addresses: order snapshots and the per-user address book.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hoi_core::AddressType;

/// A complete postal address.
///
/// Used as the shipping snapshot on orders and as the body of a saved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    pub name: String,
    pub phone: String,
    pub pincode: String,
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(default)]
    pub address_type: AddressType,
}

/// An entry in a user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: Uuid,
    #[serde(flatten)]
    pub address: PostalAddress,
    #[serde(default)]
    pub is_default: bool,
}

/// A required address field was missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} is required")]
pub struct MissingField(pub &'static str);

/// Loosely typed address payload as sent by clients.
///
/// Every field is optional so the same shape serves create, partial update,
/// and the shipping address of a new order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub pincode: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub landmark: Option<String>,
    pub address_type: Option<AddressType>,
    pub is_default: Option<bool>,
}

impl AddressInput {
    /// Build a complete address, requiring name, phone, pincode, line 1,
    /// city and state to be present and non-blank.
    ///
    /// # Errors
    ///
    /// Returns the first missing field in that order.
    pub fn to_postal(&self) -> Result<PostalAddress, MissingField> {
        Ok(PostalAddress {
            name: required(self.name.as_deref(), "name")?,
            phone: required(self.phone.as_deref(), "phone")?,
            pincode: required(self.pincode.as_deref(), "pincode")?,
            address_line1: required(self.address_line1.as_deref(), "addressLine1")?,
            address_line2: optional(self.address_line2.as_deref()),
            city: required(self.city.as_deref(), "city")?,
            state: required(self.state.as_deref(), "state")?,
            landmark: optional(self.landmark.as_deref()),
            address_type: self.address_type.unwrap_or_default(),
        })
    }

    /// Overwrite every field present in this input.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` when a required field is sent blank. The
    /// address is left untouched in that case.
    pub fn apply_to(&self, address: &mut PostalAddress) -> Result<(), MissingField> {
        let name = replace(self.name.as_deref(), &address.name, "name")?;
        let phone = replace(self.phone.as_deref(), &address.phone, "phone")?;
        let pincode = replace(self.pincode.as_deref(), &address.pincode, "pincode")?;
        let line1 = replace(
            self.address_line1.as_deref(),
            &address.address_line1,
            "addressLine1",
        )?;
        let city = replace(self.city.as_deref(), &address.city, "city")?;
        let state = replace(self.state.as_deref(), &address.state, "state")?;

        address.name = name;
        address.phone = phone;
        address.pincode = pincode;
        address.address_line1 = line1;
        address.city = city;
        address.state = state;
        if self.address_line2.is_some() {
            address.address_line2 = optional(self.address_line2.as_deref());
        }
        if self.landmark.is_some() {
            address.landmark = optional(self.landmark.as_deref());
        }
        if let Some(t) = self.address_type {
            address.address_type = t;
        }
        Ok(())
    }
}

/// A sent value must be non-blank; an absent one keeps `current`.
fn replace(value: Option<&str>, current: &str, field: &'static str) -> Result<String, MissingField> {
    match value {
        Some(_) => required(value, field),
        None => Ok(current.to_owned()),
    }
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, MissingField> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or(MissingField(field))
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
