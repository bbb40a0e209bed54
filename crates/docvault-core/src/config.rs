//! Configuration module
//!
//! Settings are read from the process environment, after loading a `.env` file
//! from the working directory when one exists. Variables already set in the
//! environment win over the file. Every value has a default except vendor
//! credentials.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::storage_types::StorageVendor;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: usize = 100;
const PRESIGN_EXPIRY_SECS: u64 = 900;
/// Longest lifetime object storage accepts for a presigned URL (7 days).
const MAX_PRESIGN_EXPIRY_SECS: u64 = 604_800;
const STORAGE_REQUEST_TIMEOUT_SECS: u64 = 30;
const VERSION_COMMIT_RETRIES: u32 = 3;
const DEFAULT_S3_REGION: &str = "us-east-1";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./storage";

/// Storage vendor settings. Every vendor with complete settings is registered,
/// `vendor` only decides where new documents go.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub vendor: StorageVendor,
    pub s3_bucket: Option<String>,
    pub s3_region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    pub s3_endpoint: Option<String>,
    pub azure_account: Option<String>,
    pub azure_access_key: Option<String>,
    pub azure_container: Option<String>,
    pub local_storage_path: String,
    pub presign_expiry_secs: u64,
    pub request_timeout_secs: u64,
}

impl StorageConfig {
    pub fn presign_expiry(&self) -> Duration {
        Duration::from_secs(self.presign_expiry_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn object_storage_configured(&self) -> bool {
        self.s3_bucket.is_some()
    }

    pub fn blob_storage_configured(&self) -> bool {
        self.azure_account.is_some() && self.azure_container.is_some()
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    /// Postgres connection string. When unset the in-memory record store is used.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub max_upload_size_bytes: usize,
    pub version_commit_retries: u32,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a dotenv-format file alone, without touching the
    /// process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let vars = dotenvy::from_path_iter(path.as_ref())?
            .collect::<Result<HashMap<String, String>, _>>()?;
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vendor = match get("STORAGE_VENDOR") {
            Some(raw) => raw.parse::<StorageVendor>()?,
            None => StorageVendor::Local,
        };

        let storage = StorageConfig {
            vendor,
            s3_bucket: get("S3_BUCKET"),
            s3_region: get("S3_REGION")
                .or_else(|| get("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
            s3_endpoint: get("S3_ENDPOINT"),
            azure_account: get("AZURE_STORAGE_ACCOUNT"),
            azure_access_key: get("AZURE_STORAGE_ACCESS_KEY"),
            azure_container: get("AZURE_CONTAINER"),
            local_storage_path: get("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.to_string()),
            presign_expiry_secs: get("PRESIGN_EXPIRY_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(PRESIGN_EXPIRY_SECS),
            request_timeout_secs: get("STORAGE_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(STORAGE_REQUEST_TIMEOUT_SECS),
        };

        let max_upload_size_mb = get("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let config = Config {
            server_port: match get("PORT") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                None => SERVER_PORT,
            },
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            database_url: get("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            db_max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: get("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            version_commit_retries: get("VERSION_COMMIT_RETRIES")
                .and_then(|s| s.parse().ok())
                .unwrap_or(VERSION_COMMIT_RETRIES),
            storage,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let storage = &self.storage;

        if storage.presign_expiry_secs == 0 || storage.presign_expiry_secs > MAX_PRESIGN_EXPIRY_SECS
        {
            return Err(anyhow::anyhow!(
                "PRESIGN_EXPIRY_SECS must be between 1 and {}",
                MAX_PRESIGN_EXPIRY_SECS
            ));
        }
        if storage.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "STORAGE_REQUEST_TIMEOUT_SECS must be greater than 0"
            ));
        }
        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        match storage.vendor {
            StorageVendor::ObjectStorage if !storage.object_storage_configured() => {
                return Err(anyhow::anyhow!(
                    "S3_BUCKET must be set when STORAGE_VENDOR is object_storage"
                ));
            }
            StorageVendor::BlobStorage if !storage.blob_storage_configured() => {
                return Err(anyhow::anyhow!(
                    "AZURE_STORAGE_ACCOUNT and AZURE_CONTAINER must be set when STORAGE_VENDOR is blob_storage"
                ));
            }
            _ => {}
        }

        if self.is_production() && self.database_url.is_none() {
            return Err(anyhow::anyhow!("DATABASE_URL must be set in production"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load(vars: &[(&str, &str)]) -> Result<Config, anyhow::Error> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.storage.vendor, StorageVendor::Local);
        assert_eq!(config.storage.presign_expiry(), Duration::from_secs(900));
        assert_eq!(config.max_upload_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.version_commit_retries, 3);
        assert_eq!(config.storage.s3_region, "us-east-1");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_object_storage_requires_bucket() {
        assert!(load(&[("STORAGE_VENDOR", "s3")]).is_err());

        let config = load(&[
            ("STORAGE_VENDOR", "object_storage"),
            ("S3_BUCKET", "docs"),
            ("AWS_REGION", "eu-west-1"),
        ])
        .unwrap();
        assert_eq!(config.storage.vendor, StorageVendor::ObjectStorage);
        assert_eq!(config.storage.s3_region, "eu-west-1");
    }

    #[test]
    fn test_blob_storage_requires_account_and_container() {
        assert!(load(&[("STORAGE_VENDOR", "azure"), ("AZURE_STORAGE_ACCOUNT", "acct")]).is_err());

        let config = load(&[
            ("STORAGE_VENDOR", "blob_storage"),
            ("AZURE_STORAGE_ACCOUNT", "acct"),
            ("AZURE_CONTAINER", "documents"),
        ])
        .unwrap();
        assert!(config.storage.blob_storage_configured());
        assert!(!config.storage.object_storage_configured());
    }

    #[test]
    fn test_presign_expiry_bounds() {
        assert!(load(&[("PRESIGN_EXPIRY_SECS", "0")]).is_err());
        assert!(load(&[("PRESIGN_EXPIRY_SECS", "604801")]).is_err());
        assert!(load(&[("PRESIGN_EXPIRY_SECS", "3600")]).is_ok());
    }

    #[test]
    fn test_unknown_vendor_rejected() {
        assert!(load(&[("STORAGE_VENDOR", "nfs")]).is_err());
    }

    #[test]
    fn test_production_requires_database() {
        assert!(load(&[("ENVIRONMENT", "production")]).is_err());
        let config = load(&[
            ("ENVIRONMENT", "production"),
            ("DATABASE_URL", "postgres://localhost/docvault"),
        ])
        .unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_port_rejected() {
        assert!(load(&[("PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_env_file_values_are_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# object storage in staging").unwrap();
        writeln!(file, "STORAGE_VENDOR=object_storage").unwrap();
        writeln!(file, "S3_BUCKET=staging-docs").unwrap();
        writeln!(file, "PORT=8081").unwrap();
        writeln!(file, "MAX_UPLOAD_SIZE_MB=5").unwrap();
        file.flush().unwrap();

        let config = Config::from_env_file(file.path()).unwrap();
        assert_eq!(config.storage.vendor, StorageVendor::ObjectStorage);
        assert_eq!(config.storage.s3_bucket.as_deref(), Some("staging-docs"));
        assert_eq!(config.server_port, 8081);
        assert_eq!(config.max_upload_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::from_env_file(dir.path().join(".env")).is_err());
    }
}
