use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use quill_api::samples::DEFAULT_SAMPLE_POSTS_URL;
use quill_api::token::INSECURE_DEFAULT_SECRET;

/// Signing secrets that must never protect a production deployment.
const PLACEHOLDER_SECRETS: &[&str] = &[INSECURE_DEFAULT_SECRET, "change-me-to-a-random-string"];

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("QUILL_JWT_SECRET is unset or still a placeholder; refusing to start in production")]
    InsecureSecret,
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide settings, read once at startup and handed to whoever needs them.
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub production: bool,
    /// `None` disables the sample-post fallback.
    pub sample_posts_url: Option<String>,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup("QUILL_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let jwt_secret = lookup("QUILL_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| INSECURE_DEFAULT_SECRET.into());

        let host = lookup("QUILL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("QUILL_PORT").unwrap_or_else(|| "8000".into());
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "QUILL_HOST/QUILL_PORT",
                value: format!("{}:{}", host, port),
            })?;

        let db_path = lookup("QUILL_DB_PATH").unwrap_or_else(|| "quill.db".into()).into();

        let sample_posts_url = match lookup("QUILL_SAMPLE_POSTS_URL") {
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url),
            None => Some(DEFAULT_SAMPLE_POSTS_URL.into()),
        };

        let cors_origins = lookup("QUILL_CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect();

        let config = Self {
            jwt_secret,
            db_path,
            addr,
            production,
            sample_posts_url,
            cors_origins,
        };

        if config.production && config.uses_placeholder_secret() {
            return Err(ConfigError::InsecureSecret);
        }
        Ok(config)
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}
