use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    pub auth_mode: AuthMode,
    pub storage: StorageConfig,
    pub upload_url_ttl_secs: u64,
    pub strict_quota: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    /// Holds the HS256 secret read from `FLUXBOX_JWT_SECRET`.
    Jwt(String),
    /// Identity is supplied by a trusted reverse proxy in the named header.
    TrustedHeader(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    Memory {
        bucket: String,
    },
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    },
}

impl StorageConfig {
    pub fn bucket(&self) -> &str {
        match self {
            StorageConfig::Memory { bucket } | StorageConfig::S3 { bucket, .. } => bucket,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::Memory { bucket } if bucket.is_empty() => {
                Err("bucket name must not be empty".to_string())
            }
            StorageConfig::Memory { .. } => Ok(()),
            StorageConfig::S3 {
                bucket,
                access_key_id,
                secret_access_key,
                ..
            } => {
                if bucket.is_empty() {
                    return Err("bucket name must not be empty".to_string());
                }
                if access_key_id.is_some() != secret_access_key.is_some() {
                    return Err(
                        "AWS_ACCESS_KEY and AWS_SECRET_KEY must be set together".to_string()
                    );
                }
                Ok(())
            }
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let storage = {
            let bucket = env_or("FLUXBOX_S3_BUCKET", "fluxbox");
            match env_or("FLUXBOX_STORAGE", "s3").as_str() {
                "memory" => StorageConfig::Memory { bucket },
                "s3" => StorageConfig::S3 {
                    bucket,
                    region: env_or("FLUXBOX_S3_REGION", "ap-south-2"),
                    endpoint: std::env::var("FLUXBOX_S3_ENDPOINT").ok(),
                    access_key_id: std::env::var("AWS_ACCESS_KEY").ok(),
                    secret_access_key: std::env::var("AWS_SECRET_KEY").ok(),
                    force_path_style: env_flag("FLUXBOX_S3_FORCE_PATH_STYLE", false),
                },
                other => return Err(format!("unknown FLUXBOX_STORAGE backend: {other}")),
            }
        };
        storage.validate()?;

        let auth_mode = match env_or("FLUXBOX_AUTH", "jwt").as_str() {
            "header" => AuthMode::TrustedHeader(env_or("FLUXBOX_USER_HEADER", "x-user-id")),
            "jwt" => {
                let secret = std::env::var("FLUXBOX_JWT_SECRET")
                    .map_err(|_| "FLUXBOX_JWT_SECRET required when AUTH=jwt".to_string())?;
                AuthMode::Jwt(secret)
            }
            other => return Err(format!("unknown FLUXBOX_AUTH mode: {other}")),
        };

        let upload_url_ttl_secs: u64 = env_or("FLUXBOX_UPLOAD_URL_TTL_SECS", "3600")
            .parse()
            .map_err(|e| format!("invalid upload url ttl: {e}"))?;
        if upload_url_ttl_secs == 0 {
            return Err("FLUXBOX_UPLOAD_URL_TTL_SECS must be positive".to_string());
        }

        Ok(Self {
            port: env_or("FLUXBOX_PORT", "3000")
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: env_or("FLUXBOX_DATA_DIR", "./data"),
            duckdb_memory_limit: env_or("FLUXBOX_DUCKDB_MEMORY", "512MB"),
            auth_mode,
            storage,
            upload_url_ttl_secs,
            strict_quota: env_flag("FLUXBOX_STRICT_QUOTA", true),
            cors_origins: std::env::var("FLUXBOX_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn upload_url_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_url_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3(access: Option<&str>, secret: Option<&str>) -> StorageConfig {
        StorageConfig::S3 {
            bucket: "fluxbox".to_string(),
            region: "ap-south-2".to_string(),
            endpoint: None,
            access_key_id: access.map(str::to_string),
            secret_access_key: secret.map(str::to_string),
            force_path_style: false,
        }
    }

    #[test]
    fn s3_config_requires_both_credentials_or_neither() {
        assert!(s3(None, None).validate().is_ok());
        assert!(s3(Some("a"), Some("b")).validate().is_ok());
        assert!(s3(Some("a"), None).validate().is_err());
        assert!(s3(None, Some("b")).validate().is_err());
    }

    #[test]
    fn empty_bucket_is_rejected() {
        let cfg = StorageConfig::Memory {
            bucket: String::new(),
        };
        assert!(cfg.validate().is_err());
        assert_eq!(
            StorageConfig::Memory {
                bucket: "b".to_string()
            }
            .bucket(),
            "b"
        );
    }
}
