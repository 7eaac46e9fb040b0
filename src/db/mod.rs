use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};

use crate::channels::Channel;
use crate::error::DbError;

pub mod models;

use models::{Campaign, Charity, Donation, DonationStatus, NewDonation};

pub type DbPool = Pool<Sqlite>;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS charities (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS campaigns (
        id TEXT PRIMARY KEY,
        charity_id TEXT NOT NULL REFERENCES charities(id),
        title TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS channels (
        id TEXT PRIMARY KEY,
        channel_type TEXT NOT NULL,
        label TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )"#,
    r#"CREATE TABLE IF NOT EXISTS donations (
        id TEXT PRIMARY KEY,
        charity_id TEXT NOT NULL REFERENCES charities(id),
        campaign_id TEXT REFERENCES campaigns(id),
        amount TEXT NOT NULL,
        receipt_amount TEXT,
        donation_type TEXT NOT NULL,
        frequency TEXT,
        channel_used TEXT NOT NULL,
        reference_number TEXT NOT NULL,
        reference_key TEXT NOT NULL UNIQUE,
        donation_date TEXT NOT NULL,
        message TEXT,
        is_anonymous INTEGER NOT NULL DEFAULT 0,
        donor_name TEXT,
        donor_email TEXT,
        proof_key TEXT NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )"#,
];

const DEFAULT_CHANNELS: &[(&str, &str, &str)] = &[
    ("gcash", "e_wallet", "GCash"),
    ("maya", "e_wallet", "Maya"),
    ("bank_transfer", "bank", "Bank Transfer"),
];

const DONATION_COLUMNS: &str = "id, charity_id, campaign_id, amount, receipt_amount, donation_type, frequency, \
    channel_used, reference_number, donation_date, message, is_anonymous, donor_name, donor_email, \
    proof_key, status, created_at, updated_at";

pub async fn init_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| anyhow::anyhow!("Invalid DATABASE_URL: {}", e))?
        .create_if_missing(true);

    // Every in-memory connection is its own database; keep exactly one.
    let max = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect_with(options)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;

    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &DbPool) -> Result<(), DbError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Insert the default channels that are missing. Returns how many were added.
pub async fn seed_default_channels(pool: &DbPool) -> Result<u64, DbError> {
    let mut added = 0;
    for &(id, channel_type, label) in DEFAULT_CHANNELS {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO channels (id, channel_type, label, is_active) VALUES (?, ?, ?, 1)",
        )
        .bind(id)
        .bind(channel_type)
        .bind(label)
        .execute(pool)
        .await?;
        added += result.rows_affected();
    }
    Ok(added)
}

pub async fn upsert_channel(pool: &DbPool, channel: &Channel) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO channels (id, channel_type, label, is_active) VALUES (?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET channel_type = excluded.channel_type, \
         label = excluded.label, is_active = excluded.is_active",
    )
    .bind(&channel.id)
    .bind(&channel.channel_type)
    .bind(&channel.label)
    .bind(channel.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_channels(pool: &DbPool) -> Result<Vec<Channel>, DbError> {
    let rows = sqlx::query("SELECT id, channel_type, label, is_active FROM channels ORDER BY label")
        .fetch_all(pool)
        .await?;
    rows.iter()
        .map(|row| -> Result<Channel, DbError> {
            Ok(Channel {
                id: row.try_get("id")?,
                channel_type: row.try_get("channel_type")?,
                label: row.try_get("label")?,
                is_active: row.try_get("is_active")?,
            })
        })
        .collect()
}

pub async fn create_charity(pool: &DbPool, id: &str, name: &str, now: DateTime<Utc>) -> Result<(), DbError> {
    sqlx::query("INSERT INTO charities (id, name, created_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_campaign(
    pool: &DbPool,
    id: &str,
    charity_id: &str,
    title: &str,
    now: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query("INSERT INTO campaigns (id, charity_id, title, is_active, created_at) VALUES (?, ?, ?, 1, ?)")
        .bind(id)
        .bind(charity_id)
        .bind(title)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_charity(pool: &DbPool, id: &str) -> Result<Option<Charity>, DbError> {
    let row = sqlx::query("SELECT id, name, created_at FROM charities WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| -> Result<Charity, DbError> {
        Ok(Charity {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
            created_at: r.try_get("created_at")?,
        })
    })
    .transpose()
}

pub async fn get_campaign(pool: &DbPool, id: &str) -> Result<Option<Campaign>, DbError> {
    let row = sqlx::query("SELECT id, charity_id, title, is_active, created_at FROM campaigns WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| -> Result<Campaign, DbError> {
        Ok(Campaign {
            id: r.try_get("id")?,
            charity_id: r.try_get("charity_id")?,
            title: r.try_get("title")?,
            is_active: r.try_get("is_active")?,
            created_at: r.try_get("created_at")?,
        })
    })
    .transpose()
}

/// Key used for duplicate-reference detection.
pub fn reference_key(reference: &str) -> String {
    reference.trim().to_lowercase()
}

pub async fn add_donation(pool: &DbPool, donation: &NewDonation, now: DateTime<Utc>) -> Result<(), DbError> {
    sqlx::query(
        r#"INSERT INTO donations (
            id, charity_id, campaign_id, amount, receipt_amount, donation_type, frequency,
            channel_used, reference_number, reference_key, donation_date, message, is_anonymous,
            donor_name, donor_email, proof_key, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&donation.id)
    .bind(&donation.charity_id)
    .bind(&donation.campaign_id)
    .bind(donation.amount.to_string())
    .bind(donation.receipt_amount.map(|a| a.to_string()))
    .bind(&donation.donation_type)
    .bind(&donation.frequency)
    .bind(&donation.channel_used)
    .bind(&donation.reference_number)
    .bind(reference_key(&donation.reference_number))
    .bind(donation.donation_date)
    .bind(&donation.message)
    .bind(donation.is_anonymous)
    .bind(&donation.donor_name)
    .bind(&donation.donor_email)
    .bind(&donation.proof_key)
    .bind(DonationStatus::Pending.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => DbError::DuplicateReference,
        other => DbError::Sqlx(other),
    })?;
    Ok(())
}

pub async fn get_donation(pool: &DbPool, id: &str) -> Result<Option<Donation>, DbError> {
    let sql = format!("SELECT {} FROM donations WHERE id = ?", DONATION_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;
    row.as_ref().map(donation_from_row).transpose()
}

pub async fn find_donation_by_reference(pool: &DbPool, reference: &str) -> Result<Option<Donation>, DbError> {
    let sql = format!("SELECT {} FROM donations WHERE reference_key = ?", DONATION_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(reference_key(reference))
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(donation_from_row).transpose()
}

pub async fn update_donation_status(
    pool: &DbPool,
    id: &str,
    status: DonationStatus,
    now: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query("UPDATE donations SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Display name of whoever received `donation`: the campaign, else the charity.
pub async fn recipient_name(pool: &DbPool, donation: &Donation) -> Result<String, DbError> {
    if let Some(campaign_id) = &donation.campaign_id {
        if let Some(campaign) = get_campaign(pool, campaign_id).await? {
            return Ok(campaign.title);
        }
    }
    Ok(get_charity(pool, &donation.charity_id)
        .await?
        .map(|c| c.name)
        .unwrap_or_else(|| donation.charity_id.clone()))
}

fn donation_from_row(row: &SqliteRow) -> Result<Donation, DbError> {
    let amount: String = row.try_get("amount")?;
    let receipt_amount: Option<String> = row.try_get("receipt_amount")?;
    let status: String = row.try_get("status")?;

    Ok(Donation {
        id: row.try_get("id")?,
        charity_id: row.try_get("charity_id")?,
        campaign_id: row.try_get("campaign_id")?,
        amount: parse_decimal(&amount)?,
        receipt_amount: receipt_amount.as_deref().map(parse_decimal).transpose()?,
        donation_type: row.try_get("donation_type")?,
        frequency: row.try_get("frequency")?,
        channel_used: row.try_get("channel_used")?,
        reference_number: row.try_get("reference_number")?,
        donation_date: row.try_get("donation_date")?,
        message: row.try_get("message")?,
        is_anonymous: row.try_get("is_anonymous")?,
        donor_name: row.try_get("donor_name")?,
        donor_email: row.try_get("donor_email")?,
        proof_key: row.try_get("proof_key")?,
        status: status.parse().map_err(DbError::Corrupt)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn parse_decimal(raw: &str) -> Result<Decimal, DbError> {
    Decimal::from_str(raw).map_err(|e| DbError::Corrupt(format!("amount '{}': {}", raw, e)))
}
