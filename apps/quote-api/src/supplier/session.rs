//! # Supplier Session
//!
//! One shared login, reused until it expires.
//!
//! ```text
//! session()
//!   │
//!   ├─ read lock: cached and not expired? ──yes──► clone, return
//!   │
//!   └─ write lock: still missing/expired? ──no───► clone, return
//!                        │                          (another task refreshed)
//!                       yes
//!                        ▼
//!                 Authenticator::login() ──► store, return
//! ```
//!
//! Concurrent callers that find the session stale queue on the write lock,
//! so only the first one logs in.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::SupplierResult;

/// An authenticated supplier session.
#[derive(Clone, PartialEq, Eq)]
pub struct SupplierSession {
    /// `Cookie` header value (`name=value; name2=value2`).
    pub cookie: String,
    pub established_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SupplierSession {
    pub fn new(cookie: impl Into<String>, established_at: DateTime<Utc>, ttl: Duration) -> Self {
        SupplierSession {
            cookie: cookie.into(),
            established_at,
            expires_at: established_at + ttl,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Cookie values are credentials.
impl std::fmt::Debug for SupplierSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupplierSession")
            .field("cookie", &"***")
            .field("established_at", &self.established_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces a fresh session.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self) -> SupplierResult<SupplierSession>;
}

/// Holds the current session and refreshes it on demand.
pub struct SessionManager {
    authenticator: Arc<dyn Authenticator>,
    current: RwLock<Option<SupplierSession>>,
}

impl SessionManager {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        SessionManager {
            authenticator,
            current: RwLock::new(None),
        }
    }

    /// Returns a valid session, logging in if needed.
    pub async fn session(&self) -> SupplierResult<SupplierSession> {
        self.session_at(Utc::now()).await
    }

    /// [`SessionManager::session`] against an explicit clock.
    pub async fn session_at(&self, now: DateTime<Utc>) -> SupplierResult<SupplierSession> {
        {
            let current = self.current.read().await;
            if let Some(session) = current.as_ref().filter(|s| !s.is_expired(now)) {
                debug!("Reusing supplier session");
                return Ok(session.clone());
            }
        }

        let mut current = self.current.write().await;
        if let Some(session) = current.as_ref().filter(|s| !s.is_expired(now)) {
            return Ok(session.clone());
        }

        let session = self.authenticator.login().await?;
        info!(expires_at = %session.expires_at, "Supplier session established");
        *current = Some(session.clone());
        Ok(session)
    }

    /// Drops the cached session; the next call logs in again.
    pub async fn invalidate(&self) {
        if self.current.write().await.take().is_some() {
            debug!("Supplier session invalidated");
        }
    }

    /// Drops the cached session only if it is still `rejected`.
    ///
    /// A concurrent caller may already have replaced the rejected session
    /// with a fresh one; that one is kept. Returns true if it dropped.
    pub async fn invalidate_rejected(&self, rejected: &SupplierSession) -> bool {
        let mut current = self.current.write().await;
        if current.as_ref() == Some(rejected) {
            *current = None;
            debug!("Rejected supplier session invalidated");
            true
        } else {
            false
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
