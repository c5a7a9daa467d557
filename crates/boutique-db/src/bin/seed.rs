//! # Seed Data Generator
//!
//! Populates the catalog with test products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p boutique-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p boutique-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p boutique-db --bin seed -- --db ./data/boutique.db
//! ```
//!
//! ## Generated Products
//! Each category carries the VAT rate it is sold under:
//! - Books and newspapers at 6%
//! - Food at 6%
//! - Restaurant vouchers at 12%
//! - Homeware and textiles at 21%
//! - Gift cards at 0%
//!
//! Prices are HT, between €2.99 and €41.98 before the variant surcharge.
//! Roughly one product in twenty is created inactive so that the
//! "inactive product" path can be exercised from the storefront.

use std::env;

use boutique_db::{Database, DbConfig, NewProduct};

/// Product categories with their VAT rate in basis points.
const CATEGORIES: &[(&str, u32, &[&str])] = &[
    (
        "Books",
        600,
        &[
            "Cookbook",
            "City guide",
            "Travel journal",
            "Comic album",
            "Children's picture book",
            "Poetry collection",
            "Art monograph",
        ],
    ),
    (
        "Food",
        600,
        &[
            "Dark chocolate bar",
            "Speculoos biscuits",
            "Waffle mix",
            "Organic honey",
            "Ground coffee",
            "Loose leaf tea",
            "Fruit jam",
            "Sea salt caramels",
        ],
    ),
    (
        "Vouchers",
        1200,
        &["Brunch voucher", "Dinner for two", "Tasting menu"],
    ),
    (
        "Home",
        2100,
        &[
            "Stoneware mug",
            "Linen tea towel",
            "Scented candle",
            "Ceramic vase",
            "Oak cutting board",
            "Wool throw",
            "Glass carafe",
            "Cotton tote bag",
            "Enamel plate",
        ],
    ),
    ("Gift cards", 0, &["Gift card"]),
];

/// Variants with their HT surcharge in cents.
const VARIANTS: &[(&str, i64)] = &[("", 0), ("Large", 350), ("Gift box", 500)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./boutique_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Boutique Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./boutique_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Boutique Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Catalog already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut seed = 0;

    // Cycle through the catalog until `count` products exist, numbering
    // each pass so names stay distinct.
    'outer: for edition in 1.. {
        for (category, vat_rate_bps, names) in CATEGORIES {
            for name in names.iter() {
                for (variant, surcharge) in VARIANTS {
                    if generated >= count {
                        break 'outer;
                    }

                    let product = generate_product(category, name, variant, *surcharge, *vat_rate_bps, edition, seed);
                    seed += 1;

                    if let Err(e) = db.products().insert(&product).await {
                        eprintln!("Failed to insert {}: {}", product.name, e);
                        continue;
                    }

                    generated += 1;
                    if generated % 100 == 0 {
                        println!("  Generated {} products...", generated);
                    }
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    let active = db.products().list_active(u32::MAX).await?;
    println!("  Active: {}", active.len());
    println!("  Inactive: {}", generated.saturating_sub(active.len()));

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn generate_product(
    category: &str,
    name: &str,
    variant: &str,
    surcharge: i64,
    vat_rate_bps: u32,
    edition: usize,
    seed: usize,
) -> NewProduct {
    let mut full_name = name.to_string();
    if !variant.is_empty() {
        full_name.push_str(&format!(" ({})", variant));
    }
    if edition > 1 {
        full_name.push_str(&format!(" #{}", edition));
    }

    // €2.99 - €41.98 HT
    let base_price = 299 + ((seed * 37) % 3900) as i64;

    NewProduct {
        name: full_name,
        description: Some(format!("{} / {}", category, name)),
        price_ht_cents: base_price + surcharge,
        vat_rate_bps,
        is_active: seed % 20 != 19,
    }
}
