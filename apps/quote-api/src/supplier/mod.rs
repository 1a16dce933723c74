//! # Supplier Ordering
//!
//! Places priced invoices as orders with the supplier's REST API.
//!
//! ## Order Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Supplier Order Flow                              │
//! │                                                                         │
//! │  Invoice ──► build_order_payload ──► OrderPayload                       │
//! │                                          │                              │
//! │                                          ▼                              │
//! │  SessionManager::session() ──► cached? ──yes──► POST /submitOrder       │
//! │                                   │                     │               │
//! │                                   no                    │ 401/403       │
//! │                                   ▼                     ▼               │
//! │                            POST /login          invalidate + retry once │
//! │                         (Set-Cookie → session)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod session;

pub use client::{HttpAuthenticator, SupplierClient};
pub use session::{Authenticator, SessionManager, SupplierSession};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SupplierSettings;
use roofquote_core::Invoice;

/// Job number sent on every order; the supplier account has a single job.
pub const JOB_NUMBER: &str = "999";

/// Shipping method code for delivery ("O" = our truck).
pub const SHIPPING_METHOD: &str = "O";

pub const PICKUP_TIME: &str = "Afternoon";

// =============================================================================
// Errors
// =============================================================================

/// Supplier API errors.
#[derive(Debug, Error)]
pub enum SupplierError {
    /// Credentials or account id missing from configuration.
    #[error("Supplier ordering is not configured")]
    NotConfigured,

    /// Login succeeded at the HTTP level but returned no session cookie.
    #[error("Supplier login failed: {0}")]
    LoginFailed(String),

    /// Transport failure (DNS, TLS, timeout, connection reset).
    #[error("Supplier request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The supplier answered with a non-success status.
    #[error("Supplier rejected {endpoint} with status {status}: {body}")]
    Rejected {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// An invoice line cannot be ordered as-is.
    #[error("Invoice line '{category}' cannot be ordered: {reason}")]
    InvalidLine { category: String, reason: String },
}

pub type SupplierResult<T> = Result<T, SupplierError>;

impl SupplierError {
    /// True when the session should be dropped and the call retried.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SupplierError::Rejected { status: 401 | 403, .. })
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// Delivery address for an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address1: String,
    #[serde(default)]
    pub address2: String,
    pub city: String,
    pub postal_code: String,
    pub state: String,
}

/// Caller-supplied order details that are not on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub purchase_order_no: String,
    #[serde(default)]
    pub special_instruction: String,
    pub address: ShippingAddress,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub item_number: String,
    pub quantity: i64,
    pub unit_of_measure: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipping {
    pub shipping_method: String,
    pub shipping_branch: String,
    pub address: ShippingAddress,
}

/// Body of `POST /submitOrder`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub account_id: String,
    pub api_site_id: String,
    pub job: Job,
    pub purchase_order_no: String,
    pub line_items: Vec<LineItem>,
    pub shipping: Shipping,
    pub special_instruction: String,
    /// Material delivery date, `YYYY-MM-DD`.
    pub pickup_date: String,
    pub pickup_time: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub site_id: &'a str,
    pub persistent_login_type: &'a str,
    pub user_agent: &'a str,
    pub api_site_id: &'a str,
}

impl<'a> LoginRequest<'a> {
    pub fn from_settings(settings: &'a SupplierSettings) -> Self {
        LoginRequest {
            username: &settings.username,
            password: &settings.password,
            site_id: &settings.site_id,
            persistent_login_type: &settings.persistent_login_type,
            user_agent: &settings.user_agent,
            api_site_id: &settings.api_site_id,
        }
    }
}

/// Builds the order body for an invoice.
///
/// ## Errors
/// * `SupplierError::InvalidLine` - A line has a non-positive quantity or
///   no product id. Such lines are priced on the invoice but cannot be
///   ordered.
pub fn build_order_payload(
    invoice: &Invoice,
    details: &OrderDetails,
    settings: &SupplierSettings,
) -> SupplierResult<OrderPayload> {
    let line_items = invoice
        .lines
        .iter()
        .map(|line| {
            if line.product_id.trim().is_empty() {
                return Err(SupplierError::InvalidLine {
                    category: line.category.clone(),
                    reason: "missing product id".to_string(),
                });
            }
            if line.quantity <= 0 {
                return Err(SupplierError::InvalidLine {
                    category: line.category.clone(),
                    reason: format!("quantity {} is not positive", line.quantity),
                });
            }
            Ok(LineItem {
                item_number: line.product_id.clone(),
                quantity: line.quantity,
                unit_of_measure: line.unit.clone(),
            })
        })
        .collect::<SupplierResult<Vec<_>>>()?;

    Ok(OrderPayload {
        account_id: settings.account_id.clone(),
        api_site_id: settings.api_site_id.clone(),
        job: Job {
            job_number: JOB_NUMBER.to_string(),
        },
        purchase_order_no: details.purchase_order_no.clone(),
        line_items,
        shipping: Shipping {
            shipping_method: SHIPPING_METHOD.to_string(),
            shipping_branch: settings.shipping_branch.clone(),
            address: details.address.clone(),
        },
        special_instruction: details.special_instruction.clone(),
        pickup_date: invoice
            .summary
            .material_delivery_date
            .format("%Y-%m-%d")
            .to_string(),
        pickup_time: PICKUP_TIME.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use roofquote_core::{InvoiceLine, Money, ProductRecord, StructureType, Summary};

    use super::*;

    fn line(id: &str, category: &str, quantity: i64) -> InvoiceLine {
        InvoiceLine::new(
            &ProductRecord {
                product_id: id.to_string(),
                description: category.to_string(),
                unit: "BD".to_string(),
                category: category.to_string(),
                unit_price: 39.33,
                supplier: "BEACON BUILDING PRODUCTS".to_string(),
                colour: None,
            },
            quantity,
        )
        .unwrap()
    }

    fn invoice(lines: Vec<InvoiceLine>) -> Invoice {
        let total: Money = lines.iter().map(|l| l.total_price).sum();
        Invoice {
            lines,
            summary: Summary {
                type_of_structure: StructureType::Normal,
                supplier: "BEACON BUILDING PRODUCTS".to_string(),
                material_delivery_date: NaiveDate::from_ymd_opt(2024, 12, 9).unwrap(),
                installation_date: NaiveDate::from_ymd_opt(2024, 12, 19).unwrap(),
                homeowner_email: "owner@example.com".to_string(),
                drip_edge: true,
                total_invoice_amount: total,
            },
        }
    }

    fn details() -> OrderDetails {
        OrderDetails {
            purchase_order_no: "PO-1182".to_string(),
            special_instruction: "Leave at side gate".to_string(),
            address: ShippingAddress {
                address1: "24 Lakeside Drive".to_string(),
                address2: String::new(),
                city: "Rockville".to_string(),
                postal_code: "20850".to_string(),
                state: "MD".to_string(),
            },
        }
    }

    fn settings() -> SupplierSettings {
        SupplierSettings {
            account_id: "280381".to_string(),
            shipping_branch: "TUL".to_string(),
            ..SupplierSettings::default()
        }
    }

    #[test]
    fn test_payload_from_invoice() {
        let invoice = invoice(vec![line("BCN-00-CH", "Shingles", 77), line("BCN-07", "Vents", 2)]);
        let payload = build_order_payload(&invoice, &details(), &settings()).unwrap();

        assert_eq!(payload.line_items.len(), 2);
        assert_eq!(payload.line_items[0].item_number, "BCN-00-CH");
        assert_eq!(payload.line_items[0].quantity, 77);
        assert_eq!(payload.pickup_date, "2024-12-09");
        assert_eq!(payload.shipping.shipping_branch, "TUL");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["accountId"], "280381");
        assert_eq!(json["job"]["jobNumber"], "999");
        assert_eq!(json["lineItems"][1]["unitOfMeasure"], "BD");
        assert_eq!(json["shipping"]["address"]["postalCode"], "20850");
        assert_eq!(json["pickupTime"], "Afternoon");
    }

    #[test]
    fn test_non_positive_quantity_cannot_be_ordered() {
        let invoice = invoice(vec![line("BCN-00", "Shingles", 77), line("BCN-12", "Sealant", 0)]);
        let err = build_order_payload(&invoice, &details(), &settings()).unwrap_err();

        match err {
            SupplierError::InvalidLine { category, .. } => assert_eq!(category, "Sealant"),
            other => panic!("expected InvalidLine, got {:?}", other),
        }
    }

    #[test]
    fn test_login_request_wire_names() {
        let mut settings = settings();
        settings.username = "orders@example.com".to_string();
        let json = serde_json::to_value(LoginRequest::from_settings(&settings)).unwrap();

        assert_eq!(json["username"], "orders@example.com");
        assert_eq!(json["persistentLoginType"], "RememberMe");
        assert_eq!(json["apiSiteId"], "UAT");
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = SupplierError::Rejected {
            endpoint: "/submitOrder".to_string(),
            status: 401,
            body: String::new(),
        };
        assert!(err.is_unauthorized());
        assert!(!SupplierError::NotConfigured.is_unauthorized());
    }
}
