use dotenvy::dotenv;
use std::env;

use crate::error::AppError;

/// Where the JWT verification key comes from
#[derive(Debug, Clone)]
pub enum JwtKeySource {
    /// HS256 shared secret
    Secret(String),
    /// RS256 public key in PEM form
    RsaPublicPem(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: usize,
    pub jwt_key: JwtKeySource,
    /// Empty means any origin is allowed
    pub cors_allowed_origins: Vec<String>,
    pub ws_heartbeat_interval_secs: u64,
    pub ws_client_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(16);

        let jwt_key = Self::jwt_key_from_env()?;

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .map(|value| Self::parse_list(&value))
            .unwrap_or_default();

        let ws_heartbeat_interval_secs = env::var("WS_HEARTBEAT_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        let ws_client_timeout_secs = env::var("WS_CLIENT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        if ws_client_timeout_secs <= ws_heartbeat_interval_secs {
            return Err(AppError::Config(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_INTERVAL_SECS".into(),
            ));
        }

        Ok(Self {
            database_url,
            port,
            db_max_connections,
            jwt_key,
            cors_allowed_origins,
            ws_heartbeat_interval_secs,
            ws_client_timeout_secs,
        })
    }

    fn jwt_key_from_env() -> Result<JwtKeySource, AppError> {
        if let Ok(secret) = env::var("JWT_SECRET") {
            if !secret.trim().is_empty() {
                return Ok(JwtKeySource::Secret(secret));
            }
        }
        if let Ok(pem) = env::var("JWT_PUBLIC_KEY_PEM") {
            return Ok(JwtKeySource::RsaPublicPem(pem));
        }
        if let Ok(path) = env::var("JWT_PUBLIC_KEY_FILE") {
            let pem = std::fs::read_to_string(&path)
                .map_err(|e| AppError::Config(format!("read {path}: {e}")))?;
            return Ok(JwtKeySource::RsaPublicPem(pem));
        }
        Err(AppError::Config(
            "one of JWT_SECRET, JWT_PUBLIC_KEY_PEM or JWT_PUBLIC_KEY_FILE is required".into(),
        ))
    }

    fn parse_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Configuration for in-process tests; nothing is read from the environment.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            database_url: "postgres://localhost/roommate_test".into(),
            port: 0,
            db_max_connections: 1,
            jwt_key: JwtKeySource::Secret(jwt_secret.to_string()),
            cors_allowed_origins: Vec::new(),
            ws_heartbeat_interval_secs: 5,
            ws_client_timeout_secs: 30,
        }
    }
}
