//! # Supplier HTTP Client
//!
//! `reqwest` client for the supplier's ordering API.
//!
//! ## Endpoints
//! ```text
//! ┌──────────────────────┬────────┬────────────────────────────────────────┐
//! │ Endpoint             │ Method │ Notes                                  │
//! ├──────────────────────┼────────┼────────────────────────────────────────┤
//! │ /login               │ POST   │ JSON credentials → Set-Cookie session  │
//! │ /submitOrder         │ POST   │ OrderPayload, session cookie           │
//! │ /orderhistory        │ GET    │ accountId, pageNo, pageSize            │
//! └──────────────────────┴────────┴────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, ACCEPT, COOKIE, SET_COOKIE};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::session::{Authenticator, SessionManager, SupplierSession};
use super::{build_order_payload, LoginRequest, OrderDetails, SupplierError, SupplierResult};
use crate::config::SupplierSettings;
use roofquote_core::Invoice;

pub const LOGIN_ENDPOINT: &str = "/login";
pub const SUBMIT_ORDER_ENDPOINT: &str = "/submitOrder";
pub const ORDER_HISTORY_ENDPOINT: &str = "/orderhistory";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body kept on a [`SupplierError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), endpoint)
}

/// Joins `Set-Cookie` headers into one `Cookie` header value.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.contains('=') && !pair.starts_with('='))
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

async fn read_json(endpoint: &str, response: reqwest::Response) -> SupplierResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(MAX_ERROR_BODY)
            .collect();
        return Err(SupplierError::Rejected {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    // Some endpoints answer 200 with an empty body.
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&bytes).map_err(|e| SupplierError::Rejected {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body: format!("invalid JSON: {}", e),
    })
}

// =============================================================================
// Login
// =============================================================================

/// Logs in with the configured credentials.
pub struct HttpAuthenticator {
    http: reqwest::Client,
    settings: SupplierSettings,
}

impl HttpAuthenticator {
    pub fn new(http: reqwest::Client, settings: SupplierSettings) -> Self {
        HttpAuthenticator { http, settings }
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    async fn login(&self) -> SupplierResult<SupplierSession> {
        if !self.settings.is_configured() {
            return Err(SupplierError::NotConfigured);
        }

        info!(username = %self.settings.username, "Logging in to supplier");

        let response = self
            .http
            .post(endpoint_url(&self.settings.base_url, LOGIN_ENDPOINT))
            .header(ACCEPT, "application/json")
            .json(&LoginRequest::from_settings(&self.settings))
            .send()
            .await?;

        let cookie = session_cookie(response.headers());
        read_json(LOGIN_ENDPOINT, response).await?;

        let cookie = cookie
            .ok_or_else(|| SupplierError::LoginFailed("no session cookie in response".into()))?;

        Ok(SupplierSession::new(
            cookie,
            Utc::now(),
            self.settings.session_ttl(),
        ))
    }
}

// =============================================================================
// Client
// =============================================================================

/// Supplier API client with a shared session.
pub struct SupplierClient {
    http: reqwest::Client,
    settings: SupplierSettings,
    sessions: SessionManager,
}

impl SupplierClient {
    /// Creates a client that logs in over HTTP.
    pub fn new(settings: SupplierSettings) -> SupplierResult<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let authenticator = Arc::new(HttpAuthenticator::new(http.clone(), settings.clone()));
        Ok(Self::with_authenticator(http, settings, authenticator))
    }

    /// Creates a client with a custom session source.
    pub fn with_authenticator(
        http: reqwest::Client,
        settings: SupplierSettings,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        SupplierClient {
            http,
            settings,
            sessions: SessionManager::new(authenticator),
        }
    }

    pub fn settings(&self) -> &SupplierSettings {
        &self.settings
    }

    /// Returns the current session, logging in if it is missing or stale.
    pub async fn login(&self) -> SupplierResult<SupplierSession> {
        self.sessions.session().await
    }

    /// Places an order for every line of `invoice`.
    ///
    /// ## Returns
    /// The supplier's JSON response (order confirmation).
    pub async fn submit_order(
        &self,
        invoice: &Invoice,
        details: &OrderDetails,
    ) -> SupplierResult<Value> {
        if !self.settings.is_configured() {
            return Err(SupplierError::NotConfigured);
        }

        let payload = build_order_payload(invoice, details, &self.settings)?;
        info!(
            purchase_order_no = %payload.purchase_order_no,
            lines = payload.line_items.len(),
            pickup_date = %payload.pickup_date,
            "Submitting supplier order"
        );

        let url = &endpoint_url(&self.settings.base_url, SUBMIT_ORDER_ENDPOINT);
        let payload = &payload;
        let response = self
            .authorized(|session| async move {
                let response = self
                    .http
                    .post(url)
                    .header(ACCEPT, "application/json")
                    .header(COOKIE, session.cookie)
                    .json(payload)
                    .send()
                    .await?;
                read_json(SUBMIT_ORDER_ENDPOINT, response).await
            })
            .await?;

        info!("Supplier order accepted");
        Ok(response)
    }

    /// Fetches one page of the account's order history.
    pub async fn order_history(&self, page: u32, page_size: u32) -> SupplierResult<Value> {
        if !self.settings.is_configured() {
            return Err(SupplierError::NotConfigured);
        }

        debug!(page, page_size, "Fetching supplier order history");

        let url = &endpoint_url(&self.settings.base_url, ORDER_HISTORY_ENDPOINT);
        let query = &[
            ("accountId", self.settings.account_id.clone()),
            ("pageNo", page.to_string()),
            ("pageSize", page_size.to_string()),
        ];

        self.authorized(|session| async move {
            let response = self
                .http
                .get(url)
                .header(ACCEPT, "application/json")
                .header(COOKIE, session.cookie)
                .query(query)
                .send()
                .await?;
            read_json(ORDER_HISTORY_ENDPOINT, response).await
        })
        .await
    }

    /// Runs `call` with a session; on 401/403 logs in again and retries once.
    async fn authorized<T, F, Fut>(&self, call: F) -> SupplierResult<T>
    where
        F: Fn(SupplierSession) -> Fut,
        Fut: Future<Output = SupplierResult<T>>,
    {
        let session = self.sessions.session().await?;
        match call(session.clone()).await {
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "Supplier session rejected, logging in again");
                self.sessions.invalidate_rejected(&session).await;
                let session = self.sessions.session().await?;
                call(session).await
            }
            other => other,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
