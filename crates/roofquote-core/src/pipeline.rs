//! # Quote Pipeline
//!
//! The three flows the service layer exposes, each a pure function over a
//! [`CatalogReader`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  estimate_quantities   Measurement + Counts ──► factors + QuantityMap    │
//! │  price_quantities      QuantityMap + Order  ──► Invoice                 │
//! │  build_invoice         Measurement + Counts + Order ──► Invoice         │
//! │                        (= estimate_quantities, then price_quantities)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{resolve_product, CatalogReader, ProductQuery};
use crate::error::CoreResult;
use crate::invoice::{assemble, Invoice};
use crate::quantity::{compute_quantities, measurement_environment, QuantityMap};
use crate::types::{Counts, FormulaRule, Measurement, OrderMetadata, ProductRecord};
use crate::validation::{validate_measurement, validate_order_metadata, validate_quantity_map};
use crate::wastage::{check_wastage_variables, resolve_wastage_factors};

/// Quantities for one job, with the wastage factors that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityEstimate {
    pub wastage_factors: IndexMap<String, f64>,
    pub quantities: QuantityMap,
}

/// Resolves wastage factors and computes every category quantity.
pub fn estimate_quantities<C>(
    catalog: &C,
    measurement: &Measurement,
    counts: Counts,
) -> CoreResult<QuantityEstimate>
where
    C: CatalogReader + ?Sized,
{
    validate_measurement(measurement)?;

    let formulas = catalog.formula_rules()?;
    check_wastage_variables(&formulas)?;
    let derived = catalog.derived_variables()?;
    let env = measurement_environment(measurement, &derived)?;

    let wastage_factors = resolve_wastage_factors(catalog, &formulas, &env)?;
    let quantities =
        compute_quantities(&formulas, &env, counts, &wastage_factors).into_quantities()?;

    Ok(QuantityEstimate {
        wastage_factors,
        quantities,
    })
}

/// Resolves one product per quantity category for the order's supplier.
///
/// Colour-variant categories are looked up with the order's shingle colour
/// (`Default` resolving to Charcoal); every other category ignores colour.
pub fn resolve_products<C>(
    catalog: &C,
    formulas: &[FormulaRule],
    quantities: &QuantityMap,
    order: &OrderMetadata,
) -> CoreResult<IndexMap<String, ProductRecord>>
where
    C: CatalogReader + ?Sized,
{
    let mut products = IndexMap::with_capacity(quantities.len());

    for category in quantities.keys() {
        let is_colour_variant = formulas
            .iter()
            .find(|f| &f.category == category)
            .is_some_and(|f| f.is_colour_variant);

        let mut query = ProductQuery::new(category.clone(), order.supplier.clone());
        if is_colour_variant {
            query = query.with_colour(order.shingle_colour.catalog_name());
        }

        products.insert(category.clone(), resolve_product(catalog, &query)?);
    }

    Ok(products)
}

/// Prices caller-supplied quantities.
pub fn price_quantities<C>(
    catalog: &C,
    quantities: &QuantityMap,
    order: &OrderMetadata,
) -> CoreResult<Invoice>
where
    C: CatalogReader + ?Sized,
{
    validate_quantity_map(quantities)?;
    validate_order_metadata(order)?;

    let formulas = catalog.formula_rules()?;
    let products = resolve_products(catalog, &formulas, quantities, order)?;
    assemble(quantities, &products, order)
}

/// Measurement to invoice in one call.
pub fn build_invoice<C>(
    catalog: &C,
    measurement: &Measurement,
    counts: Counts,
    order: &OrderMetadata,
) -> CoreResult<Invoice>
where
    C: CatalogReader + ?Sized,
{
    validate_order_metadata(order)?;
    let estimate = estimate_quantities(catalog, measurement, counts)?;
    price_quantities(catalog, &estimate.quantities, order)
}

// =============================================================================
// Unit Tests
// =============================================================================
