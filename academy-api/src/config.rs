/// Configuration management for the API server
///
/// Configuration is read from environment variables; a `.env` file is loaded
/// first when present.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for token signing (required, at least 32 characters)
/// - `PUBLIC_BASE_URL`: prefix for uploaded file links (default: http://localhost:8080)
/// - `UPLOAD_DIR`: where uploads are written (default: ./uploads)
/// - `FIREBASE_CREDENTIAL_PATH`: service-account JSON enabling federated login
/// - `FIREBASE_PROJECT_ID`: project id, overrides the credential file
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: *)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `RUST_LOG`: Log filter (default: academy_api=debug,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use academy_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub upload: UploadConfig,
    pub firebase: FirebaseConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode turns on HSTS
    pub production: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HMAC secret shared by access and refresh tokens
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Uploaded files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory files are written to, also served under `/uploads`
    pub dir: String,

    /// Prefix for file links handed to clients
    pub public_base_url: String,
}

/// Federated login; disabled when neither field is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub credential_path: Option<String>,
    pub project_id: Option<String>,
}

impl FirebaseConfig {
    pub fn is_enabled(&self) -> bool {
        self.credential_path.is_some() || self.project_id.is_some()
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Missing `DATABASE_URL` or `JWT_SECRET`, a short secret, or a value
    /// that doesn't parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("API_PORT must be a port number")?
            .unwrap_or(8080);

        let cors_origins = var("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let production = var("PRODUCTION")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let database_url = var("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = var("DATABASE_MAX_CONNECTIONS")
            .map(|v| v.parse::<u32>())
            .transpose()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?
            .unwrap_or(10);

        let secret = var("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }

        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret },
            upload: UploadConfig {
                dir: var("UPLOAD_DIR").unwrap_or_else(|| "./uploads".to_string()),
                public_base_url,
            },
            firebase: FirebaseConfig {
                credential_path: var("FIREBASE_CREDENTIAL_PATH"),
                project_id: var("FIREBASE_PROJECT_ID"),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> academy_shared::db::pool::DatabaseConfig {
        academy_shared::db::pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/academy"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.upload.dir, "./uploads");
        assert_eq!(config.upload.public_base_url, "http://localhost:8080");
        assert!(!config.firebase.is_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/academy"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "9000"),
            ("CORS_ORIGINS", "https://a.id, https://b.id"),
            ("PRODUCTION", "true"),
            ("PUBLIC_BASE_URL", "https://api.academy.id/"),
            ("FIREBASE_PROJECT_ID", "academy-prod"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.pool_config().max_connections, 25);
        assert_eq!(config.api.cors_origins, vec!["https://a.id", "https://b.id"]);
        assert!(config.api.production);
        assert_eq!(config.upload.public_base_url, "https://api.academy.id");
        assert!(config.firebase.is_enabled());
    }

    #[test]
    fn test_required_values() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "postgresql://x/y")])).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/academy"),
            ("JWT_SECRET", "too-short"),
        ]));

        assert!(result.is_err());
    }

    #[test]
    fn test_bad_port_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/academy"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "eighty"),
        ]));

        assert!(result.is_err());
    }
}
