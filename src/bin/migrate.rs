use std::env;
use std::path::Path;

use serde::Deserialize;

use donation_intake::db;

/// One row of the seed file: `kind,id,charity_id,name`.
#[derive(Debug, Deserialize)]
struct SeedRow {
    kind: String,
    id: String,
    #[serde(default)]
    charity_id: Option<String>,
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    println!("Starting database migration...");

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://donations.db".to_string());
    println!("Connecting to {}...", database_url);
    let pool = db::init_pool(&database_url).await?;
    println!("Schema is up to date.");

    let seeded = db::seed_default_channels(&pool).await?;
    println!("Added {} default payment channels.", seeded);

    let seed_path = env::var("SEED_FILE").unwrap_or_else(|_| "seed/charities.csv".to_string());
    if !Path::new(&seed_path).exists() {
        println!("Seed file not found at: {}", seed_path);
        return Ok(());
    }

    let mut reader = csv::Reader::from_path(&seed_path)?;
    let now = chrono::Utc::now();
    let (mut charities, mut campaigns, mut skipped) = (0, 0, 0);

    for (line, record) in reader.deserialize::<SeedRow>().enumerate() {
        let row = record.map_err(|e| anyhow::anyhow!("{} row {}: {}", seed_path, line + 1, e))?;
        match row.kind.trim() {
            "charity" => {
                if db::get_charity(&pool, &row.id).await?.is_some() {
                    skipped += 1;
                    continue;
                }
                db::create_charity(&pool, &row.id, &row.name, now).await?;
                charities += 1;
            }
            "campaign" => {
                let charity_id = row
                    .charity_id
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| anyhow::anyhow!("campaign {} has no charity_id", row.id))?;
                if db::get_campaign(&pool, &row.id).await?.is_some() {
                    skipped += 1;
                    continue;
                }
                db::create_campaign(&pool, &row.id, charity_id, &row.name, now).await?;
                campaigns += 1;
            }
            other => {
                eprintln!("Skipping row {} with unknown kind '{}'", line + 1, other);
                skipped += 1;
            }
        }
    }

    println!(
        "Seeded {} charities and {} campaigns ({} rows skipped).",
        charities, campaigns, skipped
    );
    println!("Migration completed successfully.");
    Ok(())
}
