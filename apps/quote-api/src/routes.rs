//! # HTTP Routes
//!
//! ```text
//! ┌────────┬──────────────────────────────────┬──────────────────────────────┐
//! │ Method │ Path                             │ Body → Response              │
//! ├────────┼──────────────────────────────────┼──────────────────────────────┤
//! │ GET    │ /health                          │ "OK" (503 if db unhealthy)   │
//! │ POST   │ /api/quantities                  │ measurement, counts → est.   │
//! │ POST   │ /api/invoices                    │ + order → invoice            │
//! │ POST   │ /api/invoices/from-quantities    │ quantities, order → invoice  │
//! │ POST   │ /api/extractions                 │ model reply text → meas.     │
//! │ POST   │ /api/orders/review               │ invoice → review             │
//! │ POST   │ /api/orders                      │ invoice + shipping → order   │
//! │ GET    │ /api/orders/history              │ ?page&pageSize → history     │
//! └────────┴──────────────────────────────────┴──────────────────────────────┘
//! ```

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::extraction::parse_extraction_response;
use crate::service::{EstimateOutcome, InvoiceOutcome};
use crate::supplier::OrderDetails;
use crate::AppState;
use roofquote_core::{
    normalize_measurement, Counts, Invoice, Measurement, OrderMetadata, OrderReview,
    QuantityMap, RawMeasurement,
};

/// Largest order-history page the supplier API accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct QuantitiesRequest {
    pub measurement: RawMeasurement,
    #[serde(default)]
    pub counts: Counts,
}

#[derive(Debug, Deserialize)]
pub struct InvoiceRequest {
    pub measurement: RawMeasurement,
    #[serde(default)]
    pub counts: Counts,
    pub order: OrderMetadata,
}

#[derive(Debug, Deserialize)]
pub struct FromQuantitiesRequest {
    pub quantities: QuantityMap,
    pub order: OrderMetadata,
}

#[derive(Debug, Deserialize)]
pub struct ExtractionRequest {
    /// The language model's reply, verbatim.
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractionResponse {
    pub measurement: Measurement,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub invoice: Invoice,
}

#[derive(Debug, Deserialize)]
pub struct OrderRequest {
    pub invoice: Invoice,
    #[serde(flatten)]
    pub details: OrderDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

// =============================================================================
// Router
// =============================================================================

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/quantities", post(quantities_handler))
        .route("/api/invoices", post(invoice_handler))
        .route("/api/invoices/from-quantities", post(from_quantities_handler))
        .route("/api/extractions", post(extraction_handler))
        .route("/api/orders/review", post(review_handler))
        .route("/api/orders", post(order_handler))
        .route("/api/orders/history", get(history_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.service.catalog().database().health_check().await {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "DATABASE UNAVAILABLE")
    }
}

async fn quantities_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuantitiesRequest>,
) -> Result<Json<EstimateOutcome>, ApiError> {
    let outcome = state.service.estimate(&req.measurement, req.counts).await?;
    Ok(Json(outcome))
}

async fn invoice_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InvoiceRequest>,
) -> Result<Json<InvoiceOutcome>, ApiError> {
    let outcome = state
        .service
        .invoice(&req.measurement, req.counts, &req.order)
        .await?;
    Ok(Json(outcome))
}

async fn from_quantities_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FromQuantitiesRequest>,
) -> Result<Json<Invoice>, ApiError> {
    let invoice = state
        .service
        .invoice_from_quantities(&req.quantities, &req.order)
        .await?;
    Ok(Json(invoice))
}

async fn extraction_handler(
    Json(req): Json<ExtractionRequest>,
) -> Result<Json<ExtractionResponse>, ApiError> {
    let raw = parse_extraction_response(&req.text)?;
    let (measurement, issues) = normalize_measurement(&raw);
    if !issues.is_empty() {
        info!(count = issues.len(), "Extraction reply had malformed dimensions");
    }

    Ok(Json(ExtractionResponse {
        measurement,
        warnings: issues.iter().map(ToString::to_string).collect(),
    }))
}

async fn review_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<OrderReview>, ApiError> {
    Ok(Json(state.service.review(&req.invoice)?))
}

async fn order_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OrderRequest>,
) -> Result<Json<Value>, ApiError> {
    let confirmation = state.supplier.submit_order(&req.invoice, &req.details).await?;
    Ok(Json(confirmation))
}

async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.page == 0 {
        return Err(ApiError::validation("page starts at 1"));
    }
    if query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
        return Err(ApiError::validation(format!(
            "pageSize must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }

    let history = state
        .supplier
        .order_history(query.page, query.page_size)
        .await?;
    Ok(Json(history))
}

// =============================================================================
// Unit Tests
// =============================================================================
