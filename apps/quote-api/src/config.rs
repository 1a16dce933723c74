//! # Service Configuration
//!
//! Configuration for the quote service.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ROOFQUOTE_PORT=9090                                                │
//! │     ROOFQUOTE_SUPPLIER_PASSWORD=…                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or ROOFQUOTE_CONFIG, or ./roofquote.toml          │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "roofquote.db"
//! max_connections = 5
//! seed_if_empty = true
//!
//! [catalog]
//! read_timeout_ms = 2000
//! max_retries = 3
//! initial_backoff_ms = 100
//! max_backoff_ms = 2000
//!
//! [supplier]
//! base_url = "https://beacon-uat-ng.becn.com/v1/rest/com/becn"
//! username = "orders@example.com"
//! account_id = "280381"
//! shipping_branch = "TUL"
//! session_ttl_minutes = 20
//! other_charges = 20.0
//! tax_percentage = 6.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use roofquote_core::{Money, TaxRate};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "roofquote.toml";

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Server
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// `bind_addr:port`, ready for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database
// =============================================================================

/// Catalog database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file path. `:memory:` runs against a throwaway database.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Install the standard catalog when the formula table is empty.
    #[serde(default = "default_seed_if_empty")]
    pub seed_if_empty: bool,
}

fn default_db_path() -> String {
    "roofquote.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_seed_if_empty() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            seed_if_empty: default_seed_if_empty(),
        }
    }
}

// =============================================================================
// Catalog Reads
// =============================================================================

/// Timeout and retry policy for catalog snapshot reads.
///
/// ## Retry Schedule (defaults)
/// ```text
/// attempt 1 ──fail──► wait ~100ms ──► attempt 2 ──fail──► wait ~200ms
///           ──► attempt 3 ──fail──► wait ~400ms ──► attempt 4 ──fail──► 503
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Upper bound on one snapshot read (milliseconds).
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Retries after the first attempt. 0 disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_read_timeout() -> u64 {
    2000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

fn default_max_backoff() -> u64 {
    2000
}

impl Default for CatalogSettings {
    fn default() -> Self {
        CatalogSettings {
            read_timeout_ms: default_read_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl CatalogSettings {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

// =============================================================================
// Supplier
// =============================================================================

/// Supplier ordering API settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_site_id")]
    pub site_id: String,

    #[serde(default = "default_persistent_login_type")]
    pub persistent_login_type: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_api_site_id")]
    pub api_site_id: String,

    #[serde(default)]
    pub account_id: String,

    #[serde(default)]
    pub shipping_branch: String,

    /// A login is reused until it is this old.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_minutes: i64,

    /// Flat charge added to every order review (dollars).
    #[serde(default = "default_other_charges")]
    pub other_charges: f64,

    /// Sales tax applied on the order review (percent).
    #[serde(default = "default_tax_percentage")]
    pub tax_percentage: f64,
}

fn default_base_url() -> String {
    "https://beacon-uat-ng.becn.com/v1/rest/com/becn".to_string()
}

fn default_site_id() -> String {
    "homeSite".to_string()
}

fn default_persistent_login_type() -> String {
    "RememberMe".to_string()
}

fn default_user_agent() -> String {
    "desktop".to_string()
}

fn default_api_site_id() -> String {
    "UAT".to_string()
}

fn default_session_ttl() -> i64 {
    20
}

fn default_other_charges() -> f64 {
    20.0
}

fn default_tax_percentage() -> f64 {
    6.0
}

impl Default for SupplierSettings {
    fn default() -> Self {
        SupplierSettings {
            base_url: default_base_url(),
            username: String::new(),
            password: String::new(),
            site_id: default_site_id(),
            persistent_login_type: default_persistent_login_type(),
            user_agent: default_user_agent(),
            api_site_id: default_api_site_id(),
            account_id: String::new(),
            shipping_branch: String::new(),
            session_ttl_minutes: default_session_ttl(),
            other_charges: default_other_charges(),
            tax_percentage: default_tax_percentage(),
        }
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for SupplierSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupplierSettings")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("site_id", &self.site_id)
            .field("api_site_id", &self.api_site_id)
            .field("account_id", &self.account_id)
            .field("shipping_branch", &self.shipping_branch)
            .field("session_ttl_minutes", &self.session_ttl_minutes)
            .field("other_charges", &self.other_charges)
            .field("tax_percentage", &self.tax_percentage)
            .finish()
    }
}

impl SupplierSettings {
    /// True once credentials and an account are configured.
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty() && !self.account_id.is_empty()
    }

    pub fn other_charges(&self) -> Money {
        Money::from_dollars(self.other_charges)
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_percentage(self.tax_percentage)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}

// =============================================================================
// Quote Configuration
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub supplier: SupplierSettings,
}

impl QuoteConfig {
    /// Loads configuration.
    ///
    /// ## Arguments
    /// * `config_path` - Explicit file; falls back to [`DEFAULT_CONFIG_FILE`]
    ///   when absent. A missing file means defaults.
    ///
    /// ## Returns
    /// Defaults, overlaid by the file, overlaid by `ROOFQUOTE_*` variables,
    /// validated.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            info!(?path, "Loading config from file");
            Self::from_file(&path)?
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }

        if self.database.path.is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.catalog.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "catalog.read_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.catalog.initial_backoff_ms > self.catalog.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "catalog.initial_backoff_ms ({}) exceeds catalog.max_backoff_ms ({})",
                self.catalog.initial_backoff_ms, self.catalog.max_backoff_ms
            )));
        }

        let url = &self.supplier.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "supplier.base_url must start with http:// or https://, got: {}",
                url
            )));
        }

        if self.supplier.session_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "supplier.session_ttl_minutes must be positive".into(),
            ));
        }

        if !self.supplier.other_charges.is_finite() || self.supplier.other_charges < 0.0 {
            return Err(ConfigError::Invalid(
                "supplier.other_charges must be a non-negative amount".into(),
            ));
        }

        if !(0.0..=100.0).contains(&self.supplier.tax_percentage) {
            return Err(ConfigError::Invalid(format!(
                "supplier.tax_percentage must be between 0 and 100, got: {}",
                self.supplier.tax_percentage
            )));
        }

        Ok(())
    }

    /// Applies `ROOFQUOTE_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(addr) = lookup("ROOFQUOTE_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        override_parsed(&lookup, "ROOFQUOTE_PORT", &mut self.server.port);

        // Database
        if let Some(path) = lookup("ROOFQUOTE_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = path;
        }
        override_parsed(
            &lookup,
            "ROOFQUOTE_DB_MAX_CONNECTIONS",
            &mut self.database.max_connections,
        );

        // Catalog
        override_parsed(
            &lookup,
            "ROOFQUOTE_CATALOG_TIMEOUT_MS",
            &mut self.catalog.read_timeout_ms,
        );
        override_parsed(
            &lookup,
            "ROOFQUOTE_CATALOG_MAX_RETRIES",
            &mut self.catalog.max_retries,
        );

        // Supplier
        if let Some(url) = lookup("ROOFQUOTE_SUPPLIER_URL") {
            debug!(url = %url, "Overriding supplier URL from environment");
            self.supplier.base_url = url;
        }
        if let Some(username) = lookup("ROOFQUOTE_SUPPLIER_USERNAME") {
            self.supplier.username = username;
        }
        if let Some(password) = lookup("ROOFQUOTE_SUPPLIER_PASSWORD") {
            self.supplier.password = password;
        }
        if let Some(account) = lookup("ROOFQUOTE_SUPPLIER_ACCOUNT_ID") {
            self.supplier.account_id = account;
        }
        if let Some(branch) = lookup("ROOFQUOTE_SUPPLIER_BRANCH") {
            self.supplier.shipping_branch = branch;
        }
        override_parsed(
            &lookup,
            "ROOFQUOTE_TAX_PERCENTAGE",
            &mut self.supplier.tax_percentage,
        );
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Debug,
{
    if let Some(raw) = lookup(key) {
        match raw.parse::<T>() {
            Ok(value) => {
                debug!(key, ?value, "Overriding config from environment");
                *target = value;
            }
            Err(_) => warn!(key, value = %raw, "Ignoring unparsable environment override"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = QuoteConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.catalog.read_timeout(), Duration::from_secs(2));
        assert!(!config.supplier.is_configured());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: QuoteConfig = toml::from_str(
            r#"
            [server]
            port = 9090

            [supplier]
            account_id = "280381"
            tax_percentage = 8.25
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.supplier.account_id, "280381");
        assert_eq!(config.supplier.tax_rate().bps(), 825);
        assert_eq!(config.supplier.session_ttl_minutes, 20);
    }

    #[test]
    fn test_overrides_apply_and_bad_values_ignored() {
        let env: HashMap<&str, &str> = [
            ("ROOFQUOTE_PORT", "not-a-port"),
            ("ROOFQUOTE_DB_PATH", ":memory:"),
            ("ROOFQUOTE_CATALOG_MAX_RETRIES", "5"),
            ("ROOFQUOTE_SUPPLIER_PASSWORD", "hunter2"),
        ]
        .into_iter()
        .collect();

        let mut config = QuoteConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, ":memory:");
        assert_eq!(config.catalog.max_retries, 5);
        assert_eq!(config.supplier.password, "hunter2");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = QuoteConfig::default();
        config.supplier.base_url = "ftp://supplier".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = QuoteConfig::default();
        config.catalog.initial_backoff_ms = 5000;
        assert!(config.validate().is_err());

        let mut config = QuoteConfig::default();
        config.supplier.tax_percentage = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("roofquote-does-not-exist.toml");
        let config = QuoteConfig::load(Some(path)).unwrap();
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_debug_hides_password() {
        let mut settings = SupplierSettings::default();
        settings.password = "hunter2".to_string();
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
