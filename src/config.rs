//! Environment configuration. `.env` is loaded by the binaries via `dotenvy`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

/// Where proof images go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    S3 {
        endpoint: String,
        bucket: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
    Fs { root: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub storage: StorageConfig,
    pub production: bool,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let production = lookup("RUST_ENV").as_deref() == Some("production");

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .context("BIND_ADDR must be host:port")?;

        let storage = match lookup("OBJECT_STORAGE_ENDPOINT") {
            Some(endpoint) => StorageConfig::S3 {
                endpoint,
                bucket: lookup("OBJECT_STORAGE_BUCKET").context("OBJECT_STORAGE_BUCKET must be set")?,
                region: lookup("OBJECT_STORAGE_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: lookup("OBJECT_STORAGE_ACCESS_KEY_ID")
                    .context("OBJECT_STORAGE_ACCESS_KEY_ID must be set")?,
                secret_access_key: lookup("OBJECT_STORAGE_SECRET_ACCESS_KEY")
                    .context("OBJECT_STORAGE_SECRET_ACCESS_KEY must be set")?,
            },
            None => match lookup("PROOF_STORAGE_ROOT") {
                Some(root) => StorageConfig::Fs { root },
                None if production => anyhow::bail!("proof storage must be configured in production"),
                None => StorageConfig::Memory,
            },
        };

        let allowed_origins: Vec<String> = lookup("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if production && allowed_origins.is_empty() {
            anyhow::bail!("ALLOWED_ORIGINS must contain at least one origin in production");
        }

        Ok(Self {
            bind_addr,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://donations.db".to_string()),
            storage,
            production,
            allowed_origins,
            rate_limit_per_second: parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 50)?,
            rate_limit_burst: parse_or(&lookup, "RATE_LIMIT_BURST", 100)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }

    /// Origins allowed by CORS, with local dev defaults outside production.
    pub fn cors_origins(&self) -> Vec<String> {
        if self.allowed_origins.is_empty() && !self.production {
            return vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ];
        }
        self.allowed_origins.clone()
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let base_url = lookup("INTAKE_BASE_URL").context("INTAKE_BASE_URL must be set")?;
        let timeout_secs: u64 = parse_or(&lookup, "INTAKE_TIMEOUT_SECS", 30)?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn development_defaults() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.storage, StorageConfig::Memory);
        assert_eq!(cfg.cors_origins().len(), 2);
        assert_eq!(cfg.rate_limit_burst, 100);
    }

    #[test]
    fn s3_storage_needs_credentials() {
        let err = ServerConfig::from_lookup(lookup(&[("OBJECT_STORAGE_ENDPOINT", "https://s3.local")]));
        assert!(err.is_err());

        let cfg = ServerConfig::from_lookup(lookup(&[
            ("OBJECT_STORAGE_ENDPOINT", "https://s3.local"),
            ("OBJECT_STORAGE_BUCKET", "proofs"),
            ("OBJECT_STORAGE_ACCESS_KEY_ID", "id"),
            ("OBJECT_STORAGE_SECRET_ACCESS_KEY", "secret"),
        ]))
        .unwrap();
        assert!(matches!(cfg.storage, StorageConfig::S3 { ref bucket, .. } if bucket == "proofs"));
    }

    #[test]
    fn production_requires_origins_and_storage() {
        assert!(ServerConfig::from_lookup(lookup(&[("RUST_ENV", "production")])).is_err());
        let cfg = ServerConfig::from_lookup(lookup(&[
            ("RUST_ENV", "production"),
            ("PROOF_STORAGE_ROOT", "/var/proofs"),
            ("ALLOWED_ORIGINS", "https://give.example.org, "),
        ]))
        .unwrap();
        assert_eq!(cfg.cors_origins(), vec!["https://give.example.org".to_string()]);
    }

    #[test]
    fn rejects_bad_numbers() {
        assert!(ServerConfig::from_lookup(lookup(&[("RATE_LIMIT_BURST", "lots")])).is_err());
    }

    #[test]
    fn client_config_trims_trailing_slash() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            ("INTAKE_BASE_URL", "http://localhost:8080/"),
            ("INTAKE_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "http://localhost:8080");
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(ClientConfig::from_lookup(lookup(&[])).is_err());
    }
}
