//! # Customer and Address Snapshots
//!
//! Denormalized copies of customer and address data taken at checkout.
//!
//! Snapshots are stored as JSON text next to the order and must stay
//! readable forever, so each one is a versioned enum tagged by `version`:
//!
//! ```text
//! {"version":"v1","name":"Marie Dupont","email":"marie@example.be"}
//! {"version":"v2","firstName":"Marie","lastName":"Dupont","email":"..."}
//! ```
//!
//! New snapshots are always written at the latest version. Readers accept
//! every version and go through the accessors, never the variant fields.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::validation::{validate_email, validate_required_text, ValidationResult};

const MAX_NAME_LEN: usize = 100;
const MAX_ADDRESS_FIELD_LEN: usize = 200;
const MAX_PHONE_LEN: usize = 32;

// =============================================================================
// Checkout Input
// =============================================================================

/// Customer details as submitted at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    pub customer_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// Postal address as submitted at checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddressDetails {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub street: String,
    pub street2: Option<String>,
    pub postal_code: String,
    pub city: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

// =============================================================================
// Customer Snapshot
// =============================================================================

/// Single-field name layout used by the first generation of orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshotV1 {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSnapshotV2 {
    pub customer_id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "version")]
pub enum CustomerSnapshot {
    #[serde(rename = "v1")]
    V1(CustomerSnapshotV1),
    #[serde(rename = "v2")]
    V2(CustomerSnapshotV2),
}

impl CustomerSnapshot {
    /// Validates checkout input and captures it at the latest version.
    pub fn capture(details: &CustomerDetails) -> ValidationResult<Self> {
        validate_email(&details.email)?;
        validate_required_text("firstName", &details.first_name, MAX_NAME_LEN)?;
        validate_required_text("lastName", &details.last_name, MAX_NAME_LEN)?;
        let phone = optional_text("phone", details.phone.as_deref(), MAX_PHONE_LEN)?;

        Ok(CustomerSnapshot::V2(CustomerSnapshotV2 {
            customer_id: details.customer_id,
            first_name: details.first_name.trim().to_string(),
            last_name: details.last_name.trim().to_string(),
            email: details.email.trim().to_string(),
            phone,
        }))
    }

    pub fn email(&self) -> &str {
        match self {
            CustomerSnapshot::V1(v1) => &v1.email,
            CustomerSnapshot::V2(v2) => &v2.email,
        }
    }

    pub fn full_name(&self) -> String {
        match self {
            CustomerSnapshot::V1(v1) => v1.name.clone(),
            CustomerSnapshot::V2(v2) => format!("{} {}", v2.first_name, v2.last_name),
        }
    }

    pub fn phone(&self) -> Option<&str> {
        match self {
            CustomerSnapshot::V1(v1) => v1.phone.as_deref(),
            CustomerSnapshot::V2(v2) => v2.phone.as_deref(),
        }
    }

    /// Registered customer id, if the order was placed while signed in.
    /// Version 1 snapshots predate the field.
    pub fn customer_id(&self) -> Option<i64> {
        match self {
            CustomerSnapshot::V1(_) => None,
            CustomerSnapshot::V2(v2) => v2.customer_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// =============================================================================
// Address Snapshot
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshotV1 {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub street: String,
    pub street2: Option<String>,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "version")]
pub enum AddressSnapshot {
    #[serde(rename = "v1")]
    V1(AddressSnapshotV1),
}

impl AddressSnapshot {
    /// Validates a checkout address and captures it at the latest version.
    pub fn capture(field: &str, details: &AddressDetails) -> ValidationResult<Self> {
        let name = |sub: &str| format!("{}.{}", field, sub);

        validate_required_text(&name("firstName"), &details.first_name, MAX_NAME_LEN)?;
        validate_required_text(&name("lastName"), &details.last_name, MAX_NAME_LEN)?;
        validate_required_text(&name("street"), &details.street, MAX_ADDRESS_FIELD_LEN)?;
        validate_required_text(&name("postalCode"), &details.postal_code, 16)?;
        validate_required_text(&name("city"), &details.city, MAX_NAME_LEN)?;

        let country = details.country.trim().to_ascii_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidFormat {
                field: name("country"),
                reason: "must be a two-letter ISO country code".to_string(),
            });
        }

        Ok(AddressSnapshot::V1(AddressSnapshotV1 {
            first_name: details.first_name.trim().to_string(),
            last_name: details.last_name.trim().to_string(),
            company: optional_text(&name("company"), details.company.as_deref(), MAX_ADDRESS_FIELD_LEN)?,
            street: details.street.trim().to_string(),
            street2: optional_text(&name("street2"), details.street2.as_deref(), MAX_ADDRESS_FIELD_LEN)?,
            postal_code: details.postal_code.trim().to_string(),
            city: details.city.trim().to_string(),
            country,
        }))
    }

    /// Normalized view of the address, whatever version it was stored at.
    pub fn current(&self) -> &AddressSnapshotV1 {
        match self {
            AddressSnapshot::V1(v1) => v1,
        }
    }

    pub fn recipient(&self) -> String {
        let address = self.current();
        format!("{} {}", address.first_name, address.last_name)
    }

    /// Printable address lines, as used on the confirmation email.
    pub fn lines(&self) -> Vec<String> {
        let a = self.current();
        let mut lines = vec![self.recipient()];
        lines.extend(a.company.clone());
        lines.push(a.street.clone());
        lines.extend(a.street2.clone());
        lines.push(format!("{} {}", a.postal_code, a.city));
        lines.push(a.country.clone());
        lines
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Trims an optional field, treating blank as absent.
fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => {
            validate_required_text(field, v, max)?;
            Ok(Some(v.to_string()))
        }
        _ => Ok(None),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerDetails {
        CustomerDetails {
            customer_id: Some(42),
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            email: "marie@example.be".to_string(),
            phone: Some("  ".to_string()),
        }
    }

    fn address() -> AddressDetails {
        AddressDetails {
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            company: None,
            street: "Rue Neuve 1".to_string(),
            street2: None,
            postal_code: "1000".to_string(),
            city: "Bruxelles".to_string(),
            country: "be".to_string(),
        }
    }

    #[test]
    fn test_capture_customer_writes_latest_version() {
        let snapshot = CustomerSnapshot::capture(&customer()).unwrap();

        assert_eq!(snapshot.full_name(), "Marie Dupont");
        assert_eq!(snapshot.customer_id(), Some(42));
        assert_eq!(snapshot.phone(), None);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"version\":\"v2\""));
        assert!(json.contains("\"firstName\":\"Marie\""));
    }

    #[test]
    fn test_capture_customer_requires_email() {
        let mut details = customer();
        details.email = String::new();
        assert!(matches!(
            CustomerSnapshot::capture(&details),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_legacy_customer_snapshot_still_parses() {
        let json = r#"{"version":"v1","name":"Jan Peeters","email":"jan@example.be","phone":null}"#;
        let snapshot = CustomerSnapshot::from_json(json).unwrap();

        assert_eq!(snapshot.full_name(), "Jan Peeters");
        assert_eq!(snapshot.email(), "jan@example.be");
        assert_eq!(snapshot.customer_id(), None);
    }

    #[test]
    fn test_unknown_snapshot_version_is_rejected() {
        let json = r#"{"version":"v9","email":"x@example.be"}"#;
        assert!(CustomerSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_capture_address_normalizes_country() {
        let snapshot = AddressSnapshot::capture("shippingAddress", &address()).unwrap();

        assert_eq!(snapshot.current().country, "BE");
        assert_eq!(
            snapshot.lines(),
            vec!["Marie Dupont", "Rue Neuve 1", "1000 Bruxelles", "BE"]
        );

        let back = AddressSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_capture_address_reports_nested_field() {
        let mut details = address();
        details.city = " ".to_string();

        match AddressSnapshot::capture("billingAddress", &details) {
            Err(ValidationError::Required { field }) => assert_eq!(field, "billingAddress.city"),
            other => panic!("expected Required, got {:?}", other),
        }
    }

    #[test]
    fn test_capture_address_rejects_bad_country() {
        let mut details = address();
        details.country = "Belgium".to_string();
        assert!(AddressSnapshot::capture("shippingAddress", &details).is_err());
    }
}
