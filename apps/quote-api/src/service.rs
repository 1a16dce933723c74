//! # Quote Service
//!
//! Runs the quote pipeline for one request: normalize the measurements,
//! load a catalog snapshot, evaluate, price.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────────────────────────┐
//! │ Operation                │ Pipeline                                     │
//! ├──────────────────────────┼──────────────────────────────────────────────┤
//! │ estimate                 │ normalize → snapshot(all) → quantities       │
//! │ invoice                  │ normalize → snapshot(supplier) → invoice     │
//! │ invoice_from_quantities  │ snapshot(supplier) → price given quantities  │
//! │ review                   │ invoice → subtotal + charges + tax (no I/O)  │
//! └──────────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Every operation runs inside a `quote` span with a fresh request id, so
//! the warnings a single job produces can be grepped together.

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::catalog_source::CatalogSource;
use crate::config::SupplierSettings;
use roofquote_core::{
    build_invoice, estimate_quantities, normalize_measurement, price_quantities, Counts,
    CoreResult, Invoice, MalformedDimension, Measurement, OrderMetadata, OrderReview,
    QuantityMap, RawMeasurement,
};

/// Result of the quantity-only flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateOutcome {
    pub measurement: Measurement,
    pub wastage_factors: IndexMap<String, f64>,
    pub quantities: QuantityMap,
    /// Measurement values that were defaulted to 0.
    pub warnings: Vec<String>,
}

/// Result of the full measurement-to-invoice flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceOutcome {
    pub measurement: Measurement,
    pub invoice: Invoice,
    pub warnings: Vec<String>,
}

/// Quote operations over the catalog store.
#[derive(Debug, Clone)]
pub struct QuoteService {
    catalog: CatalogSource,
    supplier: SupplierSettings,
}

impl QuoteService {
    pub fn new(catalog: CatalogSource, supplier: SupplierSettings) -> Self {
        QuoteService { catalog, supplier }
    }

    pub fn catalog(&self) -> &CatalogSource {
        &self.catalog
    }

    /// Wastage factors and quantities for a job, without pricing.
    pub async fn estimate(&self, raw: &RawMeasurement, counts: Counts) -> CoreResult<EstimateOutcome> {
        let span = info_span!("quote", request_id = %Uuid::new_v4(), op = "estimate");

        async move {
            let (measurement, warnings) = normalize(raw);
            let snapshot = self.catalog.snapshot(None).await?;

            let estimate = estimate_quantities(snapshot.as_ref(), &measurement, counts)?;
            info!(categories = estimate.quantities.len(), "Quantities estimated");

            Ok(EstimateOutcome {
                measurement,
                wastage_factors: estimate.wastage_factors,
                quantities: estimate.quantities,
                warnings,
            })
        }
        .instrument(span)
        .await
    }

    /// Prices a job for the order's supplier.
    pub async fn invoice(
        &self,
        raw: &RawMeasurement,
        counts: Counts,
        order: &OrderMetadata,
    ) -> CoreResult<InvoiceOutcome> {
        let span = info_span!(
            "quote",
            request_id = %Uuid::new_v4(),
            op = "invoice",
            supplier = %order.supplier
        );

        async move {
            let (measurement, warnings) = normalize(raw);
            let snapshot = self.catalog.snapshot(Some(&order.supplier)).await?;

            let invoice = build_invoice(snapshot.as_ref(), &measurement, counts, order)?;
            info!(
                lines = invoice.lines.len(),
                total = %invoice.total(),
                "Invoice built"
            );

            Ok(InvoiceOutcome {
                measurement,
                invoice,
                warnings,
            })
        }
        .instrument(span)
        .await
    }

    /// Prices caller-supplied quantities.
    pub async fn invoice_from_quantities(
        &self,
        quantities: &QuantityMap,
        order: &OrderMetadata,
    ) -> CoreResult<Invoice> {
        let span = info_span!(
            "quote",
            request_id = %Uuid::new_v4(),
            op = "invoice_from_quantities",
            supplier = %order.supplier
        );

        async move {
            let snapshot = self.catalog.snapshot(Some(&order.supplier)).await?;
            let invoice = price_quantities(snapshot.as_ref(), quantities, order)?;
            info!(
                lines = invoice.lines.len(),
                total = %invoice.total(),
                "Invoice priced from quantities"
            );
            Ok(invoice)
        }
        .instrument(span)
        .await
    }

    /// Order review with the configured charges and tax rate.
    pub fn review(&self, invoice: &Invoice) -> CoreResult<OrderReview> {
        OrderReview::from_invoice(
            invoice,
            self.supplier.other_charges(),
            self.supplier.tax_rate(),
        )
    }
}

/// Normalizes and logs every recovered dimension problem.
fn normalize(raw: &RawMeasurement) -> (Measurement, Vec<String>) {
    let (measurement, issues) = normalize_measurement(raw);
    for MalformedDimension {
        field,
        input,
        reason,
    } in &issues
    {
        warn!(field = %field, input = %input, reason = %reason, "Malformed dimension defaulted to 0");
    }
    let warnings = issues.iter().map(ToString::to_string).collect();
    (measurement, warnings)
}

// =============================================================================
// Unit Tests
// =============================================================================
