//! # Seed Data Generator
//!
//! Populates a development database with a small pharmacy.
//!
//! ## Usage
//! ```bash
//! # Seed ./rxdesk_dev.db with 3 batches per product (default)
//! cargo run -p rxdesk-db --bin seed
//!
//! # More batches per product
//! cargo run -p rxdesk-db --bin seed -- --batches 5
//!
//! # Specify database path
//! cargo run -p rxdesk-db --bin seed -- --db ./data/rxdesk.db
//! ```
//!
//! ## Generated Data
//! - Categories with a handful of products each
//! - Batches per product with expiries spread from already-expired to two
//!   years out, so every alert list has something in it
//! - A few employees and this month's recurring expenses

use std::env;

use chrono::{Duration, Utc};
use rxdesk_core::{BusinessClock, ExpenseCategory, Money};
use rxdesk_db::{Database, DbConfig, NewBatch, NewEmployee, NewExpense, NewProduct};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// (category, description, [(product, price in cents)])
const CATALOG: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "Analgesics",
        "Pain and fever relief",
        &[
            ("Paracetamol 500mg (20 tabs)", 425),
            ("Ibuprofen 400mg (20 tabs)", 650),
            ("Aspirin 75mg (28 tabs)", 310),
            ("Diclofenac Gel 50g", 890),
        ],
    ),
    (
        "Antibiotics",
        "Prescription only",
        &[
            ("Amoxicillin 250mg (21 caps)", 1_150),
            ("Azithromycin 500mg (3 tabs)", 1_780),
            ("Cefixime 400mg (5 caps)", 2_240),
        ],
    ),
    (
        "Respiratory",
        "Cough, cold and allergy",
        &[
            ("Cough Syrup 120ml", 540),
            ("Cetirizine 10mg (10 tabs)", 280),
            ("Salbutamol Inhaler", 1_320),
        ],
    ),
    (
        "Vitamins",
        "Supplements",
        &[
            ("Vitamin C 1000mg (30 tabs)", 960),
            ("Vitamin D3 (60 caps)", 1_240),
            ("Multivitamin (30 tabs)", 1_480),
        ],
    ),
    (
        "First Aid",
        "Dressings and antiseptics",
        &[
            ("Adhesive Bandages (20)", 250),
            ("Antiseptic Solution 100ml", 380),
            ("Cotton Wool 100g", 220),
        ],
    ),
];

const SUPPLIERS: &[&str] = &["MedSupply Ltd", "PharmaCo", "HealthLine Distributors"];

/// Expiry offsets in days from today, cycled across batches.
const EXPIRY_OFFSETS: &[i64] = &[-20, 12, 25, 90, 240, 540, 720];

const EMPLOYEES: &[(&str, &str, i64)] = &[
    ("Hina Qureshi", "pharmacist", 8_500_000),
    ("Asad Malik", "cashier", 4_200_000),
    ("Sana Iqbal", "cashier", 4_200_000),
    ("Bilal Ahmed", "store keeper", 3_600_000),
];

const MONTHLY_EXPENSES: &[(ExpenseCategory, i64, &str)] = &[
    (ExpenseCategory::Rent, 15_000_000, "Shop rent"),
    (ExpenseCategory::Utilities, 1_850_000, "Electricity"),
    (ExpenseCategory::Supplies, 420_000, "Receipt rolls and bags"),
    (ExpenseCategory::Transport, 160_000, "Supplier pickup"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut batches_per_product: usize = 3;
    let mut db_path = String::from("./rxdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--batches" | "-b" => {
                if i + 1 < args.len() {
                    batches_per_product = args[i + 1].parse().unwrap_or(3);
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
                println!("rxdesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -b, --batches <N>  Batches per product (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./rxdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("rxdesk Seed Data Generator");
    println!("==========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let clock: BusinessClock = db.clock();
    let today = clock.today(Utc::now());
    let mut products = 0;
    let mut batches = 0;

    for (category, description, items) in CATALOG {
        db.categories().create(category, Some(*description)).await?;

        for (name, price) in items.iter() {
            let product = db
                .products()
                .create(NewProduct {
                    name: name.to_string(),
                    category: category.to_string(),
                    price: Money::from_cents(*price),
                    description: None,
                })
                .await?;
            products += 1;

            for n in 0..batches_per_product {
                let slot = (products + n) % EXPIRY_OFFSETS.len();
                db.batches()
                    .create(NewBatch {
                        product_id: product.id.clone(),
                        supplier: Some(SUPPLIERS[slot % SUPPLIERS.len()].to_string()),
                        expiry_date: today + Duration::days(EXPIRY_OFFSETS[slot]),
                        quantity: ((products * 7 + n * 13) % 60) as i64,
                        cost_price: Money::from_cents(price * 6 / 10),
                    })
                    .await?;
                batches += 1;
            }
        }
    }
    println!("✓ {} products with {} batches", products, batches);

    for (name, role, salary) in EMPLOYEES {
        db.employees()
            .create(NewEmployee {
                name: name.to_string(),
                role: role.to_string(),
                base_salary: Money::from_cents(*salary),
                hire_date: today - Duration::days(400),
            })
            .await?;
    }
    println!("✓ {} employees", EMPLOYEES.len());

    let first_of_month = rxdesk_core::clock::Period::containing(today).first_day();
    for (category, amount, description) in MONTHLY_EXPENSES {
        db.expenses()
            .create(
                NewExpense {
                    category: *category,
                    amount: Money::from_cents(*amount),
                    date: first_of_month,
                    description: Some(description.to_string()),
                },
                "seed",
            )
            .await?;
    }
    println!("✓ {} expenses", MONTHLY_EXPENSES.len());

    info!(products, batches, "Seed complete");
    println!();
    println!("✓ Seed complete!");

    Ok(())
}
