//! Application configuration.
//!
//! Environment-variable driven with validation; `.env` files are honored in
//! development via dotenv.

use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// How the gateway authenticates form requests: a static merchant token, or
/// username/password fields inserted into the form body.
#[derive(Debug, Clone)]
pub enum AuthMode {
    Token(String),
    Credentials { username: String, password: String },
}

/// Gateway transport configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// ISO 4217 numeric currency code sent on the wire.
    pub currency_numeric: String,
    pub return_url: String,
    pub language: String,
    pub auth: AuthMode,
    /// PEM private key enabling the signed REST mode when present.
    pub signing_key_pem: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("GATEWAY_BASE_URL")
            .map_err(|_| ConfigError::Missing("GATEWAY_BASE_URL".to_string()))?;
        let return_url = env::var("GATEWAY_RETURN_URL")
            .map_err(|_| ConfigError::Missing("GATEWAY_RETURN_URL".to_string()))?;

        let auth = match env::var("GATEWAY_TOKEN").ok().filter(|t| !t.is_empty()) {
            Some(token) => AuthMode::Token(token),
            None => AuthMode::Credentials {
                username: env::var("GATEWAY_USERNAME")
                    .map_err(|_| ConfigError::Missing("GATEWAY_USERNAME".to_string()))?,
                password: env::var("GATEWAY_PASSWORD")
                    .map_err(|_| ConfigError::Missing("GATEWAY_PASSWORD".to_string()))?,
            },
        };

        Ok(Self {
            base_url,
            currency_numeric: env::var("GATEWAY_CURRENCY_NUMERIC")
                .unwrap_or_else(|_| "978".to_string()),
            return_url,
            language: env::var("GATEWAY_LANGUAGE").unwrap_or_else(|_| "en".to_string()),
            auth,
            signing_key_pem: env::var("GATEWAY_SIGNING_KEY_PEM").ok().filter(|k| !k.is_empty()),
            timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            max_retries: env::var("GATEWAY_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http") {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_BASE_URL must be an http(s) URL".to_string(),
            ));
        }
        if self.currency_numeric.parse::<u16>().is_err() {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_CURRENCY_NUMERIC must be a numeric ISO 4217 code".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "GATEWAY_TIMEOUT_SECS cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Hosted-payment-page variant configuration.
#[derive(Debug, Clone)]
pub struct HppConfig {
    pub merchant_id: String,
    pub account: String,
    pub shared_secret: String,
    pub response_url: String,
    pub hpp_url: String,
}

impl HppConfig {
    /// Returns `None` when the HPP variant is not configured at all.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let merchant_id = match env::var("HPP_MERCHANT_ID") {
            Ok(v) if !v.is_empty() => v,
            _ => return Ok(None),
        };
        Ok(Some(Self {
            merchant_id,
            account: env::var("HPP_ACCOUNT").unwrap_or_else(|_| "internet".to_string()),
            shared_secret: env::var("HPP_SHARED_SECRET")
                .map_err(|_| ConfigError::Missing("HPP_SHARED_SECRET".to_string()))?,
            response_url: env::var("HPP_RESPONSE_URL")
                .map_err(|_| ConfigError::Missing("HPP_RESPONSE_URL".to_string()))?,
            hpp_url: env::var("HPP_URL")
                .unwrap_or_else(|_| "https://pay.sandbox.realexpayments.com/pay".to_string()),
        }))
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        })
    }
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    Json,
    Plain,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("plain") => LogFormat::Plain,
            _ => LogFormat::Json,
        };
        Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format,
        }
    }
}

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub hpp: Option<HppConfig>,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();
        let config = Self {
            gateway: GatewayConfig::from_env()?,
            hpp: HppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()
    }
}
