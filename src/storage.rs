use chrono::{DateTime, Datelike, Utc};
use opendal::services::{Fs, Memory, S3};
use opendal::Operator;

use crate::config::StorageConfig;

pub fn build_operator(config: &StorageConfig) -> anyhow::Result<Operator> {
    let op = match config {
        StorageConfig::S3 {
            endpoint,
            bucket,
            region,
            access_key_id,
            secret_access_key,
        } => Operator::new(
            S3::default()
                .endpoint(endpoint)
                .bucket(bucket)
                .region(region)
                .access_key_id(access_key_id)
                .secret_access_key(secret_access_key),
        )?
        .finish(),
        StorageConfig::Fs { root } => Operator::new(Fs::default().root(root))?.finish(),
        StorageConfig::Memory => {
            tracing::warn!("Proof images are kept in memory and will not survive a restart");
            Operator::new(Memory::default())?.finish()
        }
    };
    Ok(op)
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

/// Object key for a proof image. Identical uploads map to the same key.
pub fn proof_key(bytes: &[u8], ext: &str, now: DateTime<Utc>) -> String {
    let hash = blake3::hash(bytes).to_hex().to_string();
    format!("proofs/{}/{}.{}", now.year(), hash, ext)
}

pub async fn store_proof(
    op: &Operator,
    bytes: Vec<u8>,
    content_type: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let ext = extension_for(content_type)
        .ok_or_else(|| anyhow::anyhow!("Unsupported file type: {}", content_type))?;
    let key = proof_key(&bytes, ext, now);
    op.write(&key, bytes).await?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keys_are_content_addressed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let a = proof_key(b"same", "png", now);
        assert_eq!(a, proof_key(b"same", "png", now));
        assert_ne!(a, proof_key(b"other", "png", now));
        assert!(a.starts_with("proofs/2024/"));
        assert!(a.ends_with(".png"));
    }

    #[tokio::test]
    async fn stores_into_memory_operator() {
        let op = build_operator(&StorageConfig::Memory).unwrap();
        let key = store_proof(&op, b"png-bytes".to_vec(), "image/png", Utc::now()).await.unwrap();
        let stored = op.read(&key).await.unwrap();
        assert_eq!(stored.to_vec(), b"png-bytes".to_vec());
    }

    #[tokio::test]
    async fn rejects_unknown_types() {
        let op = build_operator(&StorageConfig::Memory).unwrap();
        assert!(store_proof(&op, vec![1], "image/gif", Utc::now()).await.is_err());
    }
}
