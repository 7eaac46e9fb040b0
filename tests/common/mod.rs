use chrono::Utc;

use donation_intake::config::StorageConfig;
use donation_intake::{db, storage, AppState};

/// In-memory database with the default channels, one charity and one campaign.
pub async fn test_state() -> AppState {
    let pool = db::init_pool("sqlite::memory:").await.expect("init pool");
    db::seed_default_channels(&pool).await.expect("seed channels");
    let now = Utc::now();
    db::create_charity(&pool, "red-cross", "Philippine Red Cross", now)
        .await
        .expect("create_charity");
    db::create_campaign(&pool, "typhoon", "red-cross", "Typhoon Relief", now)
        .await
        .expect("create_campaign");
    AppState {
        db: pool,
        storage: storage::build_operator(&StorageConfig::Memory).expect("memory operator"),
        max_upload_bytes: 1024 * 1024,
    }
}
