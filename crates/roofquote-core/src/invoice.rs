//! # Invoice Assembler
//!
//! Joins quantities with resolved products into priced invoice lines and
//! attaches the order summary.
//!
//! ## Invoice Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Invoice                                                                │
//! │  ├── Invoice_Details: [InvoiceLine]    one per category, formula order  │
//! │  │     Product_ID, Description, Colour, Category, Supplier, Unit,       │
//! │  │     Unit_Price, Quantity, Total_Price                                │
//! │  └── Summary                           order metadata + total           │
//! │        Type_of_Structure, Supplier, Material_Delivery_Date,             │
//! │        Installation_Date, Homeowner_Email, Drip_Edge,                   │
//! │        Total_Invoice_Amount                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each line total is rounded to cents once; the invoice total is the exact
//! sum of the rounded line totals. Lines with zero or negative quantities are
//! kept and priced like any other line.

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::quantity::QuantityMap;
use crate::types::{OrderMetadata, ProductRecord, StructureType, TaxRate};

// =============================================================================
// Invoice Types
// =============================================================================

/// One priced category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InvoiceLine {
    #[serde(rename = "Product_ID")]
    pub product_id: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Colour")]
    pub colour: Option<String>,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Supplier")]
    pub supplier: String,
    #[serde(rename = "Unit")]
    pub unit: String,
    #[serde(rename = "Unit_Price")]
    pub unit_price: f64,
    #[serde(rename = "Quantity")]
    #[ts(type = "number")]
    pub quantity: i64,
    #[serde(rename = "Total_Price", with = "crate::money::as_dollars")]
    #[ts(type = "number")]
    pub total_price: Money,
}

impl InvoiceLine {
    /// Prices `quantity` units of `product`.
    ///
    /// ## Errors
    /// [`CoreError::AmountOutOfRange`] if the line total does not fit in cents.
    pub fn new(product: &ProductRecord, quantity: i64) -> CoreResult<Self> {
        Ok(InvoiceLine {
            product_id: product.product_id.clone(),
            description: product.description.clone(),
            colour: product.colour.clone(),
            category: product.category.clone(),
            supplier: product.supplier.clone(),
            unit: product.unit.clone(),
            unit_price: product.unit_price,
            quantity,
            total_price: priced(&product.category, quantity, product.unit_price)?,
        })
    }

    /// This line with `Total_Price` recomputed from quantity and unit price.
    pub fn repriced(&self) -> CoreResult<Self> {
        Ok(InvoiceLine {
            total_price: priced(&self.category, self.quantity, self.unit_price)?,
            ..self.clone()
        })
    }
}

fn priced(category: &str, quantity: i64, unit_price: f64) -> CoreResult<Money> {
    Money::line_total(quantity, unit_price).ok_or_else(|| CoreError::AmountOutOfRange {
        subject: format!("line total for {}", category),
    })
}

/// Exact sum of line totals.
fn lines_total(lines: &[InvoiceLine]) -> CoreResult<Money> {
    Money::checked_sum(lines.iter().map(|l| l.total_price)).ok_or_else(|| {
        CoreError::AmountOutOfRange {
            subject: "invoice total".to_string(),
        }
    })
}

/// Order details and the invoice total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Summary {
    #[serde(rename = "Type_of_Structure")]
    pub type_of_structure: StructureType,
    #[serde(rename = "Supplier")]
    pub supplier: String,
    #[serde(rename = "Material_Delivery_Date")]
    pub material_delivery_date: NaiveDate,
    #[serde(rename = "Installation_Date")]
    pub installation_date: NaiveDate,
    #[serde(rename = "Homeowner_Email")]
    pub homeowner_email: String,
    #[serde(rename = "Drip_Edge")]
    pub drip_edge: bool,
    #[serde(rename = "Total_Invoice_Amount", with = "crate::money::as_dollars")]
    #[ts(type = "number")]
    pub total_invoice_amount: Money,
}

/// A priced invoice. Built by [`assemble`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Invoice {
    #[serde(rename = "Invoice_Details")]
    pub lines: Vec<InvoiceLine>,
    #[serde(rename = "Summary")]
    pub summary: Summary,
}

impl Invoice {
    pub fn total(&self) -> Money {
        self.summary.total_invoice_amount
    }

    pub fn line(&self, category: &str) -> Option<&InvoiceLine> {
        self.lines.iter().find(|l| l.category == category)
    }
}

// =============================================================================
// Assembly
// =============================================================================

/// Builds an invoice from quantities and one resolved product per category.
///
/// ## Errors
/// [`CoreError::CategorySetMismatch`] unless `quantities` and `products`
/// cover exactly the same categories.
pub fn assemble(
    quantities: &QuantityMap,
    products: &IndexMap<String, ProductRecord>,
    order: &OrderMetadata,
) -> CoreResult<Invoice> {
    let missing_products: Vec<String> = quantities
        .keys()
        .filter(|c| !products.contains_key(*c))
        .cloned()
        .collect();
    let unexpected_products: Vec<String> = products
        .keys()
        .filter(|c| !quantities.contains_key(*c))
        .cloned()
        .collect();

    if !missing_products.is_empty() || !unexpected_products.is_empty() {
        return Err(CoreError::CategorySetMismatch {
            missing_products,
            unexpected_products,
        });
    }

    let lines = quantities
        .iter()
        .filter_map(|(category, quantity)| {
            products
                .get(category)
                .map(|product| InvoiceLine::new(product, *quantity))
        })
        .collect::<CoreResult<Vec<InvoiceLine>>>()?;

    let total = lines_total(&lines)?;

    Ok(Invoice {
        lines,
        summary: Summary {
            type_of_structure: order.type_of_structure,
            supplier: order.supplier.clone(),
            material_delivery_date: order.material_delivery_date,
            installation_date: order.installation_date,
            homeowner_email: order.homeowner_email.clone(),
            drip_edge: order.drip_edge,
            total_invoice_amount: total,
        },
    })
}

// =============================================================================
// Order Review
// =============================================================================

/// Totals shown to the estimator before an order is submitted.
///
/// ```text
/// Order_Subtotal        = Σ quantity × unit price over the lines
/// + Other_Charges
/// + Tax                 = (subtotal + other charges) × rate, half-up
/// = Total_Invoice_Amount
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderReview {
    #[serde(rename = "Invoice_Details")]
    pub lines: Vec<InvoiceLine>,
    #[serde(rename = "Material_Delivery_Date")]
    pub material_delivery_date: NaiveDate,
    #[serde(rename = "Order_Subtotal", with = "crate::money::as_dollars")]
    #[ts(type = "number")]
    pub subtotal: Money,
    #[serde(rename = "Other_Charges", with = "crate::money::as_dollars")]
    #[ts(type = "number")]
    pub other_charges: Money,
    #[serde(rename = "Tax", with = "crate::money::as_dollars")]
    #[ts(type = "number")]
    pub tax: Money,
    #[serde(rename = "Total_Invoice_Amount", with = "crate::money::as_dollars")]
    #[ts(type = "number")]
    pub total: Money,
}

impl OrderReview {
    /// Reviews an invoice as the client holds it.
    ///
    /// Line totals and the subtotal are recomputed from quantities and unit
    /// prices; the client's `Total_Price` and `Total_Invoice_Amount` are
    /// not trusted.
    ///
    /// ## Errors
    /// [`CoreError::AmountOutOfRange`] if any amount overflows `i64` cents.
    pub fn from_invoice(
        invoice: &Invoice,
        other_charges: Money,
        tax_rate: TaxRate,
    ) -> CoreResult<Self> {
        let lines = invoice
            .lines
            .iter()
            .map(InvoiceLine::repriced)
            .collect::<CoreResult<Vec<_>>>()?;
        let subtotal = lines_total(&lines)?;

        let out_of_range = |subject: &str| CoreError::AmountOutOfRange {
            subject: subject.to_string(),
        };
        let taxable = subtotal
            .checked_add(other_charges)
            .ok_or_else(|| out_of_range("order subtotal"))?;
        let tax = taxable.calculate_tax(tax_rate);
        let total = taxable
            .checked_add(tax)
            .ok_or_else(|| out_of_range("order total"))?;

        Ok(OrderReview {
            lines,
            material_delivery_date: invoice.summary.material_delivery_date,
            subtotal,
            other_charges,
            tax,
            total,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ShingleColour;

    fn order() -> OrderMetadata {
        OrderMetadata {
            type_of_structure: StructureType::Medium,
            supplier: "BEACON BUILDING PRODUCTS".to_string(),
            material_delivery_date: NaiveDate::from_ymd_opt(2024, 12, 9).unwrap(),
            installation_date: NaiveDate::from_ymd_opt(2024, 12, 19).unwrap(),
            homeowner_email: "owner@example.com".to_string(),
            drip_edge: true,
            shingle_colour: ShingleColour::Default,
        }
    }

    fn product(id: &str, category: &str, price: f64) -> ProductRecord {
        ProductRecord {
            product_id: id.to_string(),
            description: format!("{} item", category),
            unit: "BD".to_string(),
            category: category.to_string(),
            unit_price: price,
            supplier: "BEACON BUILDING PRODUCTS".to_string(),
            colour: None,
        }
    }

    fn inputs() -> (QuantityMap, IndexMap<String, ProductRecord>) {
        let mut quantities = QuantityMap::new();
        quantities.insert("Shingles".to_string(), 77);
        quantities.insert("Caps".to_string(), 3);
        quantities.insert("Back Roof Vent".to_string(), 0);

        let mut products = IndexMap::new();
        // Insert in a different order: lines follow the quantity order
        products.insert("Back Roof Vent".to_string(), product("BV-1", "Back Roof Vent", 18.99));
        products.insert("Caps".to_string(), product("CP-1", "Caps", 54.25));
        products.insert("Shingles".to_string(), product("SH-1", "Shingles", 36.5));
        (quantities, products)
    }

    #[test]
    fn test_assemble_totals() {
        let (quantities, products) = inputs();
        let invoice = assemble(&quantities, &products, &order()).unwrap();

        let categories: Vec<&str> = invoice.lines.iter().map(|l| l.category.as_str()).collect();
        assert_eq!(categories, vec!["Shingles", "Caps", "Back Roof Vent"]);

        assert_eq!(invoice.line("Shingles").unwrap().total_price.cents(), 281_050);
        assert_eq!(invoice.line("Caps").unwrap().total_price.cents(), 16_275);
        assert!(invoice.line("Back Roof Vent").unwrap().total_price.is_zero());
        assert_eq!(invoice.total().cents(), 281_050 + 16_275);
        assert_eq!(invoice.summary.supplier, "BEACON BUILDING PRODUCTS");
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let mut quantities = QuantityMap::new();
        let mut products = IndexMap::new();
        for (i, price) in [0.1, 0.2, 0.3, 19.99, 7.333].iter().enumerate() {
            let category = format!("Cat {}", i);
            quantities.insert(category.clone(), 3);
            products.insert(category.clone(), product("P", &category, *price));
        }
        let invoice = assemble(&quantities, &products, &order()).unwrap();
        let sum: Money = invoice.lines.iter().map(|l| l.total_price).sum();
        assert_eq!(invoice.total(), sum);
        assert_eq!(invoice.total().cents(), 30 + 60 + 90 + 5997 + 2200);
    }

    #[test]
    fn test_negative_quantity_is_priced() {
        let mut quantities = QuantityMap::new();
        quantities.insert("Sealant".to_string(), -2);
        let mut products = IndexMap::new();
        products.insert("Sealant".to_string(), product("SL-1", "Sealant", 6.5));

        let invoice = assemble(&quantities, &products, &order()).unwrap();
        assert_eq!(invoice.lines.len(), 1);
        assert_eq!(invoice.total().cents(), -1300);
    }

    #[test]
    fn test_category_mismatch() {
        let (mut quantities, mut products) = inputs();
        quantities.insert("Nails".to_string(), 2);
        products.insert("Staples".to_string(), product("ST-1", "Staples", 4.0));

        match assemble(&quantities, &products, &order()) {
            Err(CoreError::CategorySetMismatch {
                missing_products,
                unexpected_products,
            }) => {
                assert_eq!(missing_products, vec!["Nails".to_string()]);
                assert_eq!(unexpected_products, vec!["Staples".to_string()]);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_invoice_json_shape() {
        let (quantities, products) = inputs();
        let invoice = assemble(&quantities, &products, &order()).unwrap();
        let json = serde_json::to_value(&invoice).unwrap();

        let line = &json["Invoice_Details"][0];
        assert_eq!(line["Product_ID"], "SH-1");
        assert_eq!(line["Colour"], serde_json::Value::Null);
        assert_eq!(line["Unit_Price"], 36.5);
        assert_eq!(line["Quantity"], 77);
        assert_eq!(line["Total_Price"], 2810.5);

        let summary = &json["Summary"];
        assert_eq!(summary["Type_of_Structure"], "Medium");
        assert_eq!(summary["Material_Delivery_Date"], "2024-12-09");
        assert_eq!(summary["Drip_Edge"], true);
        assert_eq!(summary["Total_Invoice_Amount"], 2973.25);
    }

    #[test]
    fn test_order_review() {
        let (quantities, products) = inputs();
        let invoice = assemble(&quantities, &products, &order()).unwrap();

        // $2973.25 + $50.00 = $3023.25; 6% tax = $181.395 → $181.40
        let review =
            OrderReview::from_invoice(&invoice, Money::from_cents(5000), TaxRate::from_bps(600))
                .unwrap();
        assert_eq!(review.subtotal.cents(), 297_325);
        assert_eq!(review.tax.cents(), 18_140);
        assert_eq!(review.total.cents(), 302_325 + 18_140);
        assert_eq!(review.lines.len(), 3);
    }

    #[test]
    fn test_order_review_ignores_client_totals() {
        let (quantities, products) = inputs();
        let mut invoice = assemble(&quantities, &products, &order()).unwrap();
        invoice.summary.total_invoice_amount = Money::from_cents(1);
        invoice.lines[0].total_price = Money::from_cents(1);

        let review =
            OrderReview::from_invoice(&invoice, Money::from_cents(5000), TaxRate::from_bps(600))
                .unwrap();
        assert_eq!(review.subtotal.cents(), 297_325);
        assert_eq!(review.lines[0].total_price.cents(), 281_050);
        assert_eq!(review.total.cents(), 302_325 + 18_140);
    }

    #[test]
    fn test_huge_quantities_are_out_of_range() {
        let mut quantities = QuantityMap::new();
        let mut products = IndexMap::new();
        for category in ["Shingles", "Caps"] {
            quantities.insert(category.to_string(), 1_000_000_000_000_000_000);
            products.insert(category.to_string(), product("P", category, 50.0));
        }

        match assemble(&quantities, &products, &order()) {
            Err(CoreError::AmountOutOfRange { subject }) => {
                assert_eq!(subject, "line total for Shingles");
            }
            other => panic!("expected out of range, got {:?}", other),
        }
    }

    #[test]
    fn test_lines_that_fit_but_sum_past_range() {
        // Each line is 5e18 cents; two of them overflow i64
        let mut quantities = QuantityMap::new();
        let mut products = IndexMap::new();
        for category in ["Shingles", "Caps"] {
            quantities.insert(category.to_string(), 50_000_000_000_000_000);
            products.insert(category.to_string(), product("P", category, 1.0));
        }

        match assemble(&quantities, &products, &order()) {
            Err(CoreError::AmountOutOfRange { subject }) => assert_eq!(subject, "invoice total"),
            other => panic!("expected out of range, got {:?}", other),
        }
    }
}
