//! # Standard Catalog
//!
//! The 14 material categories every quote starts from, their quantity
//! formulas, the shingle/cap wastage conditions, three suppliers and a
//! price list for each.
//!
//! Used by the `seed` binary and by tests that want a realistic catalog.
//!
//! ```text
//! ┌──────────────────────────────┬────────────────────────────────────────────┐
//! │ Category                     │ Formula                                    │
//! ├──────────────────────────────┼────────────────────────────────────────────┤
//! │ Shingles                     │ shingles_wastage_factor × area / 100 × 3   │
//! │ Caps/Hip and Ridge Shingles  │ caps_wastage_factor × ridges+hips / 25     │
//! │ Back Roof Vent/Ventilation   │ Number_of_Vents                            │
//! │ Pipe Flashing/Flashings      │ Number_of_Pipe_Boots                       │
//! │ …                            │ …                                          │
//! └──────────────────────────────┴────────────────────────────────────────────┘
//! ```

use tracing::info;

use crate::error::DbResult;
use crate::pool::Database;
use roofquote_core::{FormulaRule, ProductRecord, ShingleColour, Supplier};

pub const SHINGLES: &str = "Shingles";
pub const CAPS: &str = "Caps/Hip and Ridge Shingles";

/// `(category, equation, unit, base price, colour variant)` in invoice order.
pub const CATEGORIES: &[(&str, &str, &str, f64, bool)] = &[
    (
        SHINGLES,
        "(shingles_wastage_factor * TotalRoofArea_sqft / 100) * 3",
        "BD",
        39.33,
        true,
    ),
    (
        CAPS,
        "(caps_wastage_factor * RidgesHipsLength_ft) / 25",
        "BD",
        58.67,
        true,
    ),
    ("Shingle Starters", "EavesRakesLength_ft / 100", "BD", 47.07, false),
    (
        "Sand Ice & Water Shield/Ice & Water Underlayments",
        "(EavesLength_ft + ValleysLength_ft) / 33",
        "RL",
        40.82,
        false,
    ),
    (
        "Synthetic Underlayments",
        "(shingles_wastage_factor * TotalRoofArea_sqft / 100) / 10",
        "RL",
        67.32,
        false,
    ),
    (
        "Roofing Nails/Coil Roofing Nails",
        "(TotalRoofArea_sqft / 100) / 18",
        "BX",
        50.86,
        false,
    ),
    ("Ridge Vent System/Hip Vents", "RidgesLength_ft / 4", "PC", 10.10, false),
    ("Back Roof Vent/Ventilation", "Number_of_Vents", "EA", 15.62, false),
    ("Step Flashing/Flashings", "StepFlashingLength_ft / 60", "BX", 38.16, false),
    ("Pipe Flashing/Flashings", "Number_of_Pipe_Boots", "EA", 9.09, false),
    ("Roofing Staples/Staples", "(TotalRoofArea_sqft / 100) / 8", "BX", 7.35, false),
    (
        "Construction Sealant/Adhesives, Caulks & Sealants",
        "((TotalRoofArea_sqft / 100) / 8) + 1",
        "TB",
        6.81,
        false,
    ),
    (
        "Dormer Flashing Sticks/Flashings",
        "WallFlashingLength_ft / 10",
        "PC",
        12.50,
        false,
    ),
    ("Drip Edge/Flashings", "EavesRakesLength_ft / 10", "PC", 9.85, false),
];

/// `(category, condition, factor)` in evaluation order.
pub const WASTAGE_RULES: &[(&str, &str, f64)] = &[
    (
        SHINGLES,
        "ValleysLength_ft > 0 and HipsLength_ft > 0 and Total_Valleys_Hips_Length_ft <= 40",
        1.16,
    ),
    (
        SHINGLES,
        "ValleysLength_ft > 0 and HipsLength_ft > 0 and Total_Valleys_Hips_Length_ft > 40",
        1.18,
    ),
    (SHINGLES, "ValleysLength_ft > 0 or HipsLength_ft > 0", 1.13),
    (SHINGLES, "ValleysLength_ft == 0 and HipsLength_ft == 0", 1.10),
    (CAPS, "HipsLength_ft > 0", 1.2),
    (CAPS, "HipsLength_ft == 0", 1.1),
];

/// `(supplier_id, name, product id prefix, price multiplier)`.
const SUPPLIERS: &[(&str, &str, &str, f64)] = &[
    ("SUP-001", "BEACON BUILDING PRODUCTS", "BCN", 1.0),
    ("SUP-002", "XYZ Materials", "XYZ", 1.04),
    ("SUP-003", "Roof Master", "RFM", 0.97),
];

/// What a seed run installed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub formulas: usize,
    pub wastage_rules: usize,
    pub suppliers: usize,
    pub products: usize,
}

/// Installs the standard catalog into an empty database.
///
/// ## Returns
/// * `Ok(None)` - Formulas already present; nothing was written
/// * `Ok(Some(report))` - Catalog installed
pub async fn seed_standard_catalog(db: &Database) -> DbResult<Option<SeedReport>> {
    if db.formulas().count().await? > 0 {
        return Ok(None);
    }

    let mut report = SeedReport::default();

    for (order, (category, equation, _, _, colour)) in CATEGORIES.iter().enumerate() {
        let rule = FormulaRule {
            category: category.to_string(),
            equation: equation.to_string(),
            default_wastage_factor: 1.0,
            is_colour_variant: *colour,
        };
        db.formulas().upsert(&rule, order as i64).await?;
        report.formulas += 1;
    }

    for (category, condition, factor) in WASTAGE_RULES {
        db.wastage().insert(category, condition, *factor).await?;
        report.wastage_rules += 1;
    }

    for (supplier_id, name, prefix, multiplier) in SUPPLIERS {
        db.suppliers()
            .upsert(&Supplier {
                supplier_id: supplier_id.to_string(),
                name: name.to_string(),
                warehouse: format!("{name} Central Yard"),
                contact_number: String::new(),
                po_box: String::new(),
                vendor_address: String::new(),
            })
            .await?;
        report.suppliers += 1;

        for product in price_list(name, prefix, *multiplier) {
            db.products().upsert(&product).await?;
            report.products += 1;
        }
    }

    info!(
        formulas = report.formulas,
        wastage_rules = report.wastage_rules,
        products = report.products,
        "Standard catalog seeded"
    );

    Ok(Some(report))
}

/// One supplier's products: one per plain category, one per colour for
/// colour-variant categories.
fn price_list(supplier: &str, prefix: &str, multiplier: f64) -> Vec<ProductRecord> {
    let mut products = Vec::new();

    for (index, (category, _, unit, base_price, colour_variant)) in CATEGORIES.iter().enumerate()
    {
        let unit_price = (base_price * multiplier * 100.0).round() / 100.0;
        let family = category.split('/').next().unwrap_or(category);

        if *colour_variant {
            for colour in ShingleColour::ALL
                .iter()
                .filter(|c| **c != ShingleColour::Default)
            {
                let name = colour.catalog_name();
                // "Weather Wood" → "WEWO", "Hickory" → "HI"
                let code = name
                    .split_whitespace()
                    .flat_map(|w| w.chars().take(2))
                    .collect::<String>()
                    .to_uppercase();
                products.push(ProductRecord {
                    product_id: format!("{prefix}-{index:02}-{code}"),
                    description: format!("{family} - {name}"),
                    unit: unit.to_string(),
                    category: category.to_string(),
                    unit_price,
                    supplier: supplier.to_string(),
                    colour: Some(name.to_string()),
                });
            }
        } else {
            products.push(ProductRecord {
                product_id: format!("{prefix}-{index:02}"),
                description: family.to_string(),
                unit: unit.to_string(),
                category: category.to_string(),
                unit_price,
                supplier: supplier.to_string(),
                colour: None,
            });
        }
    }

    products
}

// =============================================================================
// Unit Tests
// =============================================================================
