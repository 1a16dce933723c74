//! # Quote API Server
//!
//! ```text
//! quote-api [--config <path>]
//!
//!   1. tracing (RUST_LOG, default info)
//!   2. QuoteConfig: defaults → TOML → ROOFQUOTE_* → validate
//!   3. SQLite catalog: connect, migrate, seed if empty, lint
//!   4. axum on server.bind_addr:server.port until Ctrl+C / SIGTERM
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use roofquote_api::{router, AppState, QuoteConfig};
use roofquote_core::catalog::lint;
use roofquote_db::{seed_standard_catalog, Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Roof Quote API server...");

    // Load configuration
    let config = QuoteConfig::load(config_path())?;
    info!(
        listen = %config.server.listen_addr(),
        db_path = %config.database.path,
        supplier_configured = config.supplier.is_configured(),
        "Configuration loaded"
    );

    // Open the catalog database (migrations run on connect)
    let db_config = if config.database.path == ":memory:" {
        DbConfig::in_memory()
    } else {
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections)
    };
    let db = Database::new(db_config).await?;

    if config.database.seed_if_empty {
        if let Some(report) = seed_standard_catalog(&db).await? {
            info!(
                formulas = report.formulas,
                products = report.products,
                "Empty catalog seeded with the standard catalog"
            );
        }
    }

    // Surface catalog problems before the first quote hits them
    let snapshot = db.catalog().snapshot(None).await?;
    let issues = lint(&snapshot)?;
    for issue in &issues {
        warn!(
            subject = %issue.subject,
            expression = %issue.expression,
            problem = %issue.problem,
            "Catalog lint"
        );
    }
    info!(
        formulas = snapshot.formula_count(),
        products = snapshot.product_count(),
        lint_issues = issues.len(),
        "Catalog ready"
    );

    // Create shared state
    let state = Arc::new(AppState::new(db.clone(), &config)?);
    let app = router(state);

    let addr = config.server.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `--config <path>`, else `ROOFQUOTE_CONFIG`.
fn config_path() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    std::env::var("ROOFQUOTE_CONFIG").ok().map(PathBuf::from)
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
