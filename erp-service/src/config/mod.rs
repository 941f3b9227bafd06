use crate::models::{LineDiscountMode, TotalsPolicy};
use crate::services::SequenceStrategy;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct ErpConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub numbering: NumberingConfig,
    pub totals: TotalsConfig,
    /// Traces are exported only when set.
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumberingConfig {
    /// `counter` (atomic, default) or `count` (document count + 1).
    pub strategy: String,
}

impl NumberingConfig {
    pub fn strategy(&self) -> SequenceStrategy {
        SequenceStrategy::from_string(&self.strategy)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TotalsConfig {
    /// `ignore` (default) or `apply`.
    pub sales_line_discount: String,
}

impl TotalsConfig {
    pub fn policy(&self) -> TotalsPolicy {
        TotalsPolicy {
            sales_line_discount: LineDiscountMode::from_string(&self.sales_line_discount),
        }
    }
}

impl ErpConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        Ok(ErpConfig {
            common: common_config,
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None, is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("cinnamon_erp"), is_prod)?,
            },
            numbering: NumberingConfig {
                strategy: env::var("DOCUMENT_SEQUENCE_STRATEGY")
                    .unwrap_or_else(|_| SequenceStrategy::Counter.as_str().to_string()),
            },
            totals: TotalsConfig {
                sales_line_discount: env::var("SALES_LINE_DISCOUNT")
                    .unwrap_or_else(|_| LineDiscountMode::Ignore.as_str().to_string()),
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
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
