use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct PosConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub store: StoreBackend,
    pub auth: AuthConfig,
    pub report: ReportConfig,
    pub shop: ShopConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::ConfigError(anyhow::anyhow!(
                "Unknown STORE_BACKEND: {}. Must be one of: mongo, memory",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub username: String,
    pub password: Secret<String>,
    pub jwt_secret: Secret<String>,
    pub jwt_expiry_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Fraction of a bill total reported as tax.
    pub tax_rate: Decimal,
    pub storage_limit_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopConfig {
    /// Minutes east of UTC; the host offset when unset.
    pub utc_offset_minutes: Option<i32>,
}

impl PosConfig {
    pub fn load() -> Result<Self, AppError> {
        let mut common = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        if let Ok(level) = env::var("LOG_LEVEL") {
            common.log_level = level;
        }
        if let Ok(endpoint) = env::var("OTLP_ENDPOINT") {
            common.otlp_endpoint = Some(endpoint).filter(|e| !e.is_empty());
        }
        if let Ok(port) = env::var("PORT") {
            common.port = parse_var("PORT", &port)?;
        }

        let store: StoreBackend = get_env("STORE_BACKEND", Some("mongo"), false)?.parse()?;
        let mongo_required = is_prod && store == StoreBackend::Mongo;

        Ok(PosConfig {
            common,
            mongodb: MongoConfig {
                uri: get_env(
                    "MONGODB_URI",
                    Some("mongodb://localhost:27017"),
                    mongo_required,
                )?,
                database: get_env("MONGODB_DATABASE", Some("restaurant_pos"), false)?,
            },
            store,
            auth: AuthConfig {
                username: get_env("AUTH_USERNAME", Some("admin"), is_prod)?,
                password: Secret::new(get_env("AUTH_PASSWORD", Some("admin123"), is_prod)?),
                jwt_secret: Secret::new(get_env(
                    "JWT_SECRET",
                    Some("dev-only-insecure-jwt-secret"),
                    is_prod,
                )?),
                jwt_expiry_hours: parse_var(
                    "JWT_EXPIRY_HOURS",
                    &get_env("JWT_EXPIRY_HOURS", Some("12"), false)?,
                )?,
            },
            report: ReportConfig {
                tax_rate: parse_var(
                    "REPORT_TAX_RATE",
                    &get_env("REPORT_TAX_RATE", Some("0.10"), false)?,
                )?,
                storage_limit_mb: parse_var(
                    "STORAGE_LIMIT_MB",
                    &get_env("STORAGE_LIMIT_MB", Some("512"), false)?,
                )?,
            },
            shop: ShopConfig {
                utc_offset_minutes: match env::var("SHOP_UTC_OFFSET_MINUTES") {
                    Ok(raw) => Some(parse_var("SHOP_UTC_OFFSET_MINUTES", &raw)?),
                    Err(_) => None,
                },
            },
        })
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e))
    })
}

fn get_env(key: &str, default: Option<&str>, required: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if required {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
