//! # Catalog Seeder
//!
//! Installs the standard catalog into a database file.
//!
//! ## Usage
//! ```bash
//! # Seed ./roofquote_dev.db
//! cargo run -p roofquote-db --bin seed
//!
//! # Specify database path
//! cargo run -p roofquote-db --bin seed -- --db ./data/catalog.db
//! ```
//!
//! ## What Gets Installed
//! - 14 material categories with their quantity formulas
//! - Shingle and cap wastage conditions
//! - 3 suppliers, each with a full price list
//! - Shingles and caps in every colour

use std::env;

use roofquote_core::catalog::lint;
use roofquote_db::{seed_standard_catalog, Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./roofquote_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Roof Quote Catalog Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./roofquote_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => {
                eprintln!("⚠ Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    println!("🌱 Roof Quote Catalog Seeder");
    println!("============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let start = std::time::Instant::now();
    let Some(report) = seed_standard_catalog(&db).await? else {
        let existing = db.formulas().count().await?;
        println!("⚠ Database already has {} formulas", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    };

    println!();
    println!("✓ Seeded in {:?}", start.elapsed());
    println!("  Formulas:       {}", report.formulas);
    println!("  Wastage rules:  {}", report.wastage_rules);
    println!("  Suppliers:      {}", report.suppliers);
    println!("  Products:       {}", report.products);

    // Catch typos in stored expressions before the first quote does
    println!();
    println!("Linting stored expressions...");
    let snapshot = db.catalog().snapshot(None).await?;
    let issues = lint(&snapshot)?;
    if issues.is_empty() {
        println!("  No issues");
    } else {
        for issue in &issues {
            println!("  ⚠ {}: {} ({})", issue.subject, issue.problem, issue.expression);
        }
    }

    db.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
