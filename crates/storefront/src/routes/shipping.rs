//! Cash-on-delivery serviceability.

use axum::{Json, extract::Path};
use serde::Serialize;

use hoi_core::{cod_allowed, cod_message};

/// Result of a pincode check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PincodeCheck {
    pub pincode: String,
    pub cod_allowed: bool,
    pub message: &'static str,
}

impl PincodeCheck {
    #[must_use]
    pub fn new(pin: &str) -> Self {
        let allowed = cod_allowed(pin);
        Self {
            pincode: pin.trim().to_owned(),
            cod_allowed: allowed,
            message: cod_message(allowed),
        }
    }
}

pub async fn check_pincode(Path(pin): Path<String>) -> Json<PincodeCheck> {
    Json(PincodeCheck::new(&pin))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_pincode_check_body() {
        let body = serde_json::to_value(PincodeCheck::new(" 248001 ")).unwrap();
        assert_eq!(body["pincode"], "248001");
        assert_eq!(body["codAllowed"], true);

        let body = serde_json::to_value(PincodeCheck::new("110001")).unwrap();
        assert_eq!(body["codAllowed"], false);
        assert!(body["message"].as_str().unwrap().contains("only within"));
    }
}
