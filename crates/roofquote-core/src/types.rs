//! # Domain Types
//!
//! Core domain types for Roof Quote.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  Job inputs                         Catalog rows (read-only)            │
//! │  ──────────                         ────────────────────────            │
//! │  RawMeasurement ─► Measurement      FormulaRule   (one per category)    │
//! │  Counts (vents, pipe boots)         WastageRule   (ordered, per cat.)   │
//! │  OrderMetadata                      DerivedVariable                     │
//! │    ├── StructureType                ProductRecord (category, supplier,  │
//! │    └── ShingleColour                               colour?)             │
//! │                                     Supplier                            │
//! │                                                                         │
//! │  TaxRate (bps) - used by order review                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Wire names follow the measurement report keys (`TotalRoofArea_sqft`, ...)
//! because formulas refer to the same names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%; 600 bps = 6%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (configuration convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

// =============================================================================
// Measurement
// =============================================================================

/// Measurement field names as they appear in reports, formulas and JSON.
pub mod fields {
    pub const ADDRESS: &str = "Address";
    pub const TOTAL_ROOF_AREA: &str = "TotalRoofArea_sqft";
    pub const RIDGES_HIPS: &str = "RidgesHipsLength_ft";
    pub const VALLEYS: &str = "ValleysLength_ft";
    pub const RIDGES: &str = "RidgesLength_ft";
    pub const HIPS: &str = "HipsLength_ft";
    pub const RAKES: &str = "RakesLength_ft";
    pub const EAVES: &str = "EavesLength_ft";
    pub const EAVES_RAKES: &str = "EavesRakesLength_ft";
    pub const STEP_FLASHING: &str = "StepFlashingLength_ft";
    pub const WALL_FLASHING: &str = "WallFlashingLength_ft";

    /// Length fields, in report order. These go through the dimension
    /// normalizer; the area and the address do not.
    pub const LENGTHS: [&str; 9] = [
        RIDGES_HIPS,
        VALLEYS,
        RIDGES,
        HIPS,
        RAKES,
        EAVES,
        EAVES_RAKES,
        STEP_FLASHING,
        WALL_FLASHING,
    ];
}

/// Normalized roof measurements for one job.
///
/// All numeric fields are feet, except the area (square feet). Built once
/// per job by [`crate::dimension::normalize_measurement`] (or received
/// already numeric) and never mutated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Measurement {
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "TotalRoofArea_sqft")]
    pub total_roof_area_sqft: f64,
    #[serde(rename = "RidgesHipsLength_ft")]
    pub ridges_hips_length_ft: f64,
    #[serde(rename = "ValleysLength_ft")]
    pub valleys_length_ft: f64,
    #[serde(rename = "RidgesLength_ft")]
    pub ridges_length_ft: f64,
    #[serde(rename = "HipsLength_ft")]
    pub hips_length_ft: f64,
    #[serde(rename = "RakesLength_ft")]
    pub rakes_length_ft: f64,
    #[serde(rename = "EavesLength_ft")]
    pub eaves_length_ft: f64,
    #[serde(rename = "EavesRakesLength_ft")]
    pub eaves_rakes_length_ft: f64,
    #[serde(rename = "StepFlashingLength_ft")]
    pub step_flashing_length_ft: f64,
    #[serde(rename = "WallFlashingLength_ft")]
    pub wall_flashing_length_ft: f64,
}

impl Measurement {
    /// Numeric fields as `(name, value)` pairs, area first then lengths in
    /// report order. `Address` is never part of an evaluation environment.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 10] {
        [
            (fields::TOTAL_ROOF_AREA, self.total_roof_area_sqft),
            (fields::RIDGES_HIPS, self.ridges_hips_length_ft),
            (fields::VALLEYS, self.valleys_length_ft),
            (fields::RIDGES, self.ridges_length_ft),
            (fields::HIPS, self.hips_length_ft),
            (fields::RAKES, self.rakes_length_ft),
            (fields::EAVES, self.eaves_length_ft),
            (fields::EAVES_RAKES, self.eaves_rakes_length_ft),
            (fields::STEP_FLASHING, self.step_flashing_length_ft),
            (fields::WALL_FLASHING, self.wall_flashing_length_ft),
        ]
    }

    /// Mutable slot for a length field by its report name.
    pub(crate) fn length_mut(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            fields::RIDGES_HIPS => Some(&mut self.ridges_hips_length_ft),
            fields::VALLEYS => Some(&mut self.valleys_length_ft),
            fields::RIDGES => Some(&mut self.ridges_length_ft),
            fields::HIPS => Some(&mut self.hips_length_ft),
            fields::RAKES => Some(&mut self.rakes_length_ft),
            fields::EAVES => Some(&mut self.eaves_length_ft),
            fields::EAVES_RAKES => Some(&mut self.eaves_rakes_length_ft),
            fields::STEP_FLASHING => Some(&mut self.step_flashing_length_ft),
            fields::WALL_FLASHING => Some(&mut self.wall_flashing_length_ft),
            _ => None,
        }
    }
}

/// A measurement value as extracted from a report, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDimension {
    /// Already numeric (`2200`, `14.5`).
    Number(f64),
    /// Free-form text (`"10ft 3in"`, `"2,200 sqft"`, `"null"`).
    Text(String),
    /// Anything else the extractor produced (booleans, arrays, objects).
    Other(serde_json::Value),
}

/// Measurements exactly as the extraction step returned them.
///
/// Every field is optional; missing and `null` values normalize to 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMeasurement {
    #[serde(rename = "Address")]
    pub address: Option<String>,
    #[serde(rename = "TotalRoofArea_sqft")]
    pub total_roof_area_sqft: Option<RawDimension>,
    #[serde(rename = "RidgesHipsLength_ft")]
    pub ridges_hips_length_ft: Option<RawDimension>,
    #[serde(rename = "ValleysLength_ft")]
    pub valleys_length_ft: Option<RawDimension>,
    #[serde(rename = "RidgesLength_ft")]
    pub ridges_length_ft: Option<RawDimension>,
    #[serde(rename = "HipsLength_ft")]
    pub hips_length_ft: Option<RawDimension>,
    #[serde(rename = "RakesLength_ft")]
    pub rakes_length_ft: Option<RawDimension>,
    #[serde(rename = "EavesLength_ft")]
    pub eaves_length_ft: Option<RawDimension>,
    #[serde(rename = "EavesRakesLength_ft")]
    pub eaves_rakes_length_ft: Option<RawDimension>,
    #[serde(rename = "StepFlashingLength_ft")]
    pub step_flashing_length_ft: Option<RawDimension>,
    #[serde(rename = "WallFlashingLength_ft")]
    pub wall_flashing_length_ft: Option<RawDimension>,
}

impl RawMeasurement {
    /// Raw length values paired with their report names.
    pub fn lengths(&self) -> [(&'static str, Option<&RawDimension>); 9] {
        [
            (fields::RIDGES_HIPS, self.ridges_hips_length_ft.as_ref()),
            (fields::VALLEYS, self.valleys_length_ft.as_ref()),
            (fields::RIDGES, self.ridges_length_ft.as_ref()),
            (fields::HIPS, self.hips_length_ft.as_ref()),
            (fields::RAKES, self.rakes_length_ft.as_ref()),
            (fields::EAVES, self.eaves_length_ft.as_ref()),
            (fields::EAVES_RAKES, self.eaves_rakes_length_ft.as_ref()),
            (fields::STEP_FLASHING, self.step_flashing_length_ft.as_ref()),
            (fields::WALL_FLASHING, self.wall_flashing_length_ft.as_ref()),
        ]
    }
}

/// Item counts supplied by the estimator alongside the measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Counts {
    pub number_of_vents: u32,
    pub number_of_pipe_boots: u32,
}

// =============================================================================
// Catalog Rows
// =============================================================================

/// The quantity formula for one material category.
///
/// `equation` is an expression over measurement fields, counts, derived
/// variables and wastage variables (see [`crate::quantity`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FormulaRule {
    pub category: String,
    pub equation: String,
    /// Informational default stored with the formula. Resolution falls
    /// back to [`crate::DEFAULT_WASTAGE_FACTOR`] when no rule matches.
    pub default_wastage_factor: f64,
    /// Whether the product for this category depends on the shingle colour.
    pub is_colour_variant: bool,
}

/// A conditional wastage multiplier for a category.
///
/// Rules for the same category are tried in ascending `id` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WastageRule {
    pub id: i64,
    pub category: String,
    pub condition: String,
    pub factor: f64,
}

/// A named total computed from measurement fields before rules run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DerivedVariable {
    pub name: String,
    pub expression: String,
}

impl DerivedVariable {
    /// Creates a derived variable.
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        DerivedVariable {
            name: name.into(),
            expression: expression.into(),
        }
    }

    /// Derived totals available when the catalog declares none.
    pub fn builtin() -> Vec<DerivedVariable> {
        vec![DerivedVariable::new(
            "Total_Valleys_Hips_Length_ft",
            "ValleysLength_ft + HipsLength_ft",
        )]
    }
}

/// A priced catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductRecord {
    pub product_id: String,
    pub description: String,
    pub unit: String,
    pub category: String,
    pub unit_price: f64,
    pub supplier: String,
    /// Present only for colour-variant categories.
    pub colour: Option<String>,
}

/// A material supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub supplier_id: String,
    pub name: String,
    pub warehouse: String,
    pub contact_number: String,
    pub po_box: String,
    pub vendor_address: String,
}

// =============================================================================
// Order Metadata
// =============================================================================

/// Structure complexity of the roof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum StructureType {
    #[default]
    Normal,
    Medium,
    Complex,
}

impl std::fmt::Display for StructureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureType::Normal => write!(f, "Normal"),
            StructureType::Medium => write!(f, "Medium"),
            StructureType::Complex => write!(f, "Complex"),
        }
    }
}

/// Shingle colour selection.
///
/// `Default` is not a product colour; it stands for [`ShingleColour::Charcoal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ShingleColour {
    #[default]
    Default,
    Charcoal,
    #[serde(rename = "Weather Wood")]
    WeatherWood,
    Barkwood,
    Driftwood,
    #[serde(rename = "Pewter Gray")]
    PewterGray,
    Hickory,
    Shakewood,
}

impl ShingleColour {
    /// Every selectable value, `Default` included.
    pub const ALL: [ShingleColour; 8] = [
        ShingleColour::Default,
        ShingleColour::Charcoal,
        ShingleColour::WeatherWood,
        ShingleColour::Barkwood,
        ShingleColour::Driftwood,
        ShingleColour::PewterGray,
        ShingleColour::Hickory,
        ShingleColour::Shakewood,
    ];

    /// Resolves the `Default` alias to the colour it stands for.
    pub fn resolve(self) -> ShingleColour {
        match self {
            ShingleColour::Default => ShingleColour::Charcoal,
            other => other,
        }
    }

    /// Catalog name of the resolved colour (the `colour` column value).
    pub fn catalog_name(self) -> &'static str {
        match self.resolve() {
            ShingleColour::Default | ShingleColour::Charcoal => "Charcoal",
            ShingleColour::WeatherWood => "Weather Wood",
            ShingleColour::Barkwood => "Barkwood",
            ShingleColour::Driftwood => "Driftwood",
            ShingleColour::PewterGray => "Pewter Gray",
            ShingleColour::Hickory => "Hickory",
            ShingleColour::Shakewood => "Shakewood",
        }
    }
}

/// Order details carried through to the invoice summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderMetadata {
    pub type_of_structure: StructureType,
    /// Supplier name as stored on catalog products.
    pub supplier: String,
    pub material_delivery_date: NaiveDate,
    pub installation_date: NaiveDate,
    pub homeowner_email: String,
    pub drip_edge: bool,
    #[serde(default, alias = "shingle_color")]
    pub shingle_colour: ShingleColour,
}

// =============================================================================
// Unit Tests
// =============================================================================
