//! # Catalog Source
//!
//! Loads catalog snapshots for quote requests, bounding each read with a
//! timeout and retrying transient failures with exponential backoff.
//!
//! ## Read Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  snapshot(supplier)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  timeout(read_timeout, db.catalog().snapshot(supplier))                 │
//! │       │                                                                 │
//! │       ├── Ok(snapshot) ─────────────────────────────► Arc<snapshot>     │
//! │       │                                                                 │
//! │       ├── timed out / connection / pool error                           │
//! │       │        │                                                        │
//! │       │        ├── retries left ──► sleep(next_backoff) ──► retry       │
//! │       │        └── exhausted ─────► CatalogUnavailable                  │
//! │       │                                                                 │
//! │       └── any other DbError ──────► CatalogUnavailable (no retry)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::config::CatalogSettings;
use roofquote_core::{CatalogSnapshot, CoreError, CoreResult};
use roofquote_db::{Database, DbError};

/// Why one attempt failed.
enum AttemptError {
    TimedOut,
    Db(DbError),
}

impl AttemptError {
    fn is_transient(&self) -> bool {
        match self {
            AttemptError::TimedOut => true,
            AttemptError::Db(e) => e.is_transient(),
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::TimedOut => write!(f, "catalog read timed out"),
            AttemptError::Db(e) => write!(f, "{}", e),
        }
    }
}

/// Reads catalog snapshots from the database.
#[derive(Debug, Clone)]
pub struct CatalogSource {
    db: Database,
    settings: CatalogSettings,
}

impl CatalogSource {
    pub fn new(db: Database, settings: CatalogSettings) -> Self {
        CatalogSource { db, settings }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Loads a snapshot restricted to `supplier` (or all suppliers).
    ///
    /// ## Errors
    /// * `CoreError::CatalogUnavailable` - The read timed out or failed,
    ///   after retrying transient failures `max_retries` times
    pub async fn snapshot(&self, supplier: Option<&str>) -> CoreResult<Arc<CatalogSnapshot>> {
        let mut backoff = self.create_backoff();
        let mut retry_count = 0u32;

        loop {
            let err = match self.attempt(supplier).await {
                Ok(snapshot) => {
                    if retry_count > 0 {
                        debug!(retries = retry_count, "Catalog read succeeded after retry");
                    }
                    return Ok(Arc::new(snapshot));
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                error!(error = %err, "Catalog read failed");
                return Err(CoreError::CatalogUnavailable(err.to_string()));
            }

            if retry_count >= self.settings.max_retries {
                error!(
                    error = %err,
                    max_retries = self.settings.max_retries,
                    "Catalog read retries exhausted"
                );
                return Err(CoreError::CatalogUnavailable(err.to_string()));
            }

            retry_count += 1;
            let Some(duration) = backoff.next_backoff() else {
                return Err(CoreError::CatalogUnavailable(err.to_string()));
            };

            warn!(
                error = %err,
                attempt = retry_count,
                ?duration,
                "Catalog read failed, retrying"
            );
            tokio::time::sleep(duration).await;
        }
    }

    async fn attempt(&self, supplier: Option<&str>) -> Result<CatalogSnapshot, AttemptError> {
        match timeout(
            self.settings.read_timeout(),
            self.db.catalog().snapshot(supplier),
        )
        .await
        {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(e)) => Err(AttemptError::Db(e)),
            Err(_) => Err(AttemptError::TimedOut),
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        // current_interval seeds the first delay; the crate default is 500ms
        ExponentialBackoff {
            current_interval: self.settings.initial_backoff(),
            initial_interval: self.settings.initial_backoff(),
            max_interval: self.settings.max_backoff(),
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use roofquote_db::{seed_standard_catalog, DbConfig};
    use std::time::Duration;

    fn fast_settings(max_retries: u32) -> CatalogSettings {
        CatalogSettings {
            read_timeout_ms: 1000,
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    #[tokio::test]
    async fn test_snapshot_from_seeded_db() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_standard_catalog(&db).await.unwrap();

        let source = CatalogSource::new(db, fast_settings(0));
        let snapshot = source.snapshot(Some("XYZ Materials")).await.unwrap();

        assert_eq!(snapshot.formula_count(), 14);
        assert_eq!(snapshot.product_count(), 12 + 14);
    }

    #[tokio::test]
    async fn test_closed_pool_is_unavailable_after_retries() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        let source = CatalogSource::new(db, fast_settings(2));
        let err = source.snapshot(None).await.unwrap_err();

        assert!(matches!(err, CoreError::CatalogUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_backoff_follows_settings() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let source = CatalogSource::new(
            db,
            CatalogSettings {
                initial_backoff_ms: 100,
                max_backoff_ms: 400,
                ..CatalogSettings::default()
            },
        );

        let backoff = source.create_backoff();
        assert_eq!(backoff.initial_interval.as_millis(), 100);
        assert_eq!(backoff.max_interval.as_millis(), 400);
        assert_eq!(backoff.max_elapsed_time, None);
    }

    #[tokio::test]
    async fn test_first_retry_delay_honours_settings() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let source = CatalogSource::new(db, fast_settings(3));

        let mut backoff = source.create_backoff();
        let ceiling = Duration::from_millis(5).mul_f64(1.0 + backoff.randomization_factor);
        let first = backoff.next_backoff().unwrap();
        assert!(
            first <= Duration::from_millis(1).mul_f64(1.0 + backoff.randomization_factor),
            "first delay {:?}",
            first
        );
        for _ in 0..5 {
            let delay = backoff.next_backoff().unwrap();
            assert!(delay <= ceiling, "delay {:?} above {:?}", delay, ceiling);
        }
    }
}
