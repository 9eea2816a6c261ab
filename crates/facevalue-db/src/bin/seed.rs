//! # Seed Data Generator
//!
//! Populates a development database with catalog items and vouchers.
//!
//! ## Usage
//! ```bash
//! # Issue 50 vouchers (default) into FACEVALUE_DB_PATH
//! cargo run -p facevalue-db --bin seed
//!
//! # Issue a custom amount
//! cargo run -p facevalue-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p facevalue-db --bin seed -- --db ./data/facevalue.db
//! ```
//!
//! Vouchers go through the issuer, so they follow the configured
//! `FACEVALUE_ID_LENGTH` and `FACEVALUE_EXPIRY_DAYS` like any other issuance.
//! Every third voucher is sold as one of the gift card items.

use chrono::Utc;
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use facevalue_core::{CatalogItem, Money, TracingListener, Voucher};
use facevalue_db::repository::generate_item_id;
use facevalue_db::{Database, IssueError, IssuerConfig, VoucherIssuer};

const CURRENCY: &str = "GBP";

/// Gift card denominations offered in the catalog, in pence.
const DENOMINATIONS: &[i64] = &[1000, 2500, 5000, 10000];

/// Code length used when no `FACEVALUE_ID_LENGTH` is configured.
const DEFAULT_CODE_LENGTH: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,facevalue=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = IssuerConfig::load()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut count: usize = 50;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("facevalue Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of vouchers to issue (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: $FACEVALUE_DB_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %config.database_path, count, "Seeding database");

    let db = Database::new(config.db_config()).await?;

    let existing = db.vouchers().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has vouchers, skipping seed");
        return Ok(());
    }

    let items = seed_items(&db).await?;

    let issuer = VoucherIssuer::new(db.clone())
        .with_policy(config.policy())
        .with_listener(Arc::new(TracingListener));
    let code_length = config.id_length.unwrap_or(DEFAULT_CODE_LENGTH);

    let start = std::time::Instant::now();
    let mut issued = 0;

    for n in 0..count {
        let amount = Money::from_cents(DENOMINATIONS[n % DENOMINATIONS.len()]);
        let mut candidate = Voucher::new(random_code(code_length), CURRENCY, amount);
        if n % 3 == 0 {
            candidate = candidate.purchased_as(items[n % items.len()].id.as_str());
        }

        match issuer.create(candidate, "seed").await {
            Ok(_) => issued += 1,
            Err(IssueError::Rejected(e)) => warn!(error = %e, "Seed voucher rejected"),
            Err(e) => return Err(e.into()),
        }
    }

    info!(
        issued,
        items = items.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}

/// One gift card item per denomination.
async fn seed_items(db: &Database) -> Result<Vec<CatalogItem>, Box<dyn std::error::Error>> {
    let mut items = Vec::with_capacity(DENOMINATIONS.len());

    for cents in DENOMINATIONS {
        let price = Money::from_cents(*cents);
        let item = CatalogItem {
            id: generate_item_id(),
            sku: format!("GIFTCARD-{}", price.major()),
            name: format!("Gift card {price} {CURRENCY}"),
            price,
            currency: CURRENCY.to_string(),
            created_at: Utc::now(),
        };
        items.push(db.items().insert(&item).await?);
    }

    Ok(items)
}

/// Random code of `length` characters drawn from a v4 UUID's hex digits.
fn random_code(length: usize) -> String {
    let mut code = String::with_capacity(length);
    while code.len() < length {
        code.extend(Uuid::new_v4().simple().to_string().chars());
    }
    code.truncate(length);
    code
}
