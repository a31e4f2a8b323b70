use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use myteacher_core::generation::{
    DEFAULT_CHAT_PRICING_MODEL, DEFAULT_CLAIM_LEASE_SECS, DEFAULT_DRAW_MODEL,
    DEFAULT_IMAGE_HEIGHT, DEFAULT_IMAGE_WIDTH, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS,
};
use myteacher_core::pricing::{MODEL_ANIMAGINE_XL, MODEL_ANYTHING_V4, MODEL_SD_35_MEDIUM};
use myteacher_core::storage::{self, BACKEND_LOCAL, BACKEND_S3};
use myteacher_openai::ChatConfig;
use myteacher_pipeline::PipelineConfig;
use myteacher_replicate::api::DEFAULT_API_URL;
use myteacher_replicate::client::{
    ReplicateConfig, DEFAULT_MAX_POLLING_ATTEMPTS, DEFAULT_POLLING_INTERVAL,
};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./storage";
const DEFAULT_LOCAL_STORAGE_URL: &str = "http://localhost:8080/storage";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Where generated images are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageSettings {
    S3 { bucket: String, public_url: String },
    Local { path: String, public_url: String },
}

/// Worker configuration loaded from environment variables.
///
/// | Env Var                               | Default                        |
/// |---------------------------------------|--------------------------------|
/// | `DATABASE_URL`                        | required                       |
/// | `WORKER_POLL_INTERVAL_SECS`           | `5`                            |
/// | `WORKER_CLAIM_LEASE_SECS`             | `600`                          |
/// | `REPLICATE_API_TOKEN`                 | empty                          |
/// | `REPLICATE_API_URL`                   | `https://api.replicate.com/v1` |
/// | `REPLICATE_MODEL_VERSION`             | none (`anything-v4.0`)         |
/// | `REPLICATE_MODEL_VERSION_V2`          | none (`animagine-xl-3.1`)      |
/// | `REPLICATE_MODEL_VERSION_V3`          | none (`stable-diffusion-3.5-medium`) |
/// | `REPLICATE_TRANSPARENT_MODEL_VERSION` | none                           |
/// | `REPLICATE_MAX_POLLING_ATTEMPTS`      | `60`                           |
/// | `REPLICATE_POLLING_INTERVAL`          | `2` (seconds)                  |
/// | `OPENAI_API_KEY`                      | empty                          |
/// | `OPENAI_BASE_URL`                     | `https://api.openai.com/v1`    |
/// | `OPENAI_MODEL`                        | `gpt-4o-mini`                  |
/// | `CHAT_PRICING_MODEL`                  | `gpt-4`                        |
/// | `STORAGE_BACKEND`                     | `s3`                           |
/// | `S3_BUCKET`                           | required for `s3`              |
/// | `S3_PUBLIC_URL`                       | required for `s3`              |
/// | `LOCAL_STORAGE_PATH`                  | `./storage`                    |
/// | `LOCAL_STORAGE_URL`                   | `http://localhost:8080/storage`|
/// | `IMAGE_WIDTH` / `IMAGE_HEIGHT`        | `512`                          |
/// | `DEFAULT_DRAW_MODEL`                  | `anything-v4.0`                |
/// | `GENERATION_MAX_RETRIES`              | `3`                            |
/// | `GENERATION_RETRY_DELAY_SECS`         | `3`                            |
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub poll_interval: Duration,
    pub claim_lease: Duration,
    pub replicate_api_token: String,
    pub replicate_api_url: String,
    pub model_versions: HashMap<String, String>,
    pub default_model_version: Option<String>,
    pub transparent_model_version: Option<String>,
    pub max_polling_attempts: u32,
    pub polling_interval: Duration,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub chat_pricing_model: String,
    pub storage: StorageSettings,
    pub image_width: u32,
    pub image_height: u32,
    pub default_draw_model: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let mut model_versions = HashMap::new();
        let default_model_version = get("REPLICATE_MODEL_VERSION");
        for (key, model) in [
            ("REPLICATE_MODEL_VERSION", MODEL_ANYTHING_V4),
            ("REPLICATE_MODEL_VERSION_V2", MODEL_ANIMAGINE_XL),
            ("REPLICATE_MODEL_VERSION_V3", MODEL_SD_35_MEDIUM),
        ] {
            if let Some(version) = get(key) {
                model_versions.insert(model.to_string(), version);
            }
        }

        let backend = get("STORAGE_BACKEND").unwrap_or_else(|| BACKEND_S3.to_string());
        storage::validate_backend(&backend).map_err(|_| ConfigError::Invalid {
            key: "STORAGE_BACKEND",
            value: backend.clone(),
        })?;
        let storage = if backend == BACKEND_LOCAL {
            StorageSettings::Local {
                path: get("LOCAL_STORAGE_PATH").unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_PATH.into()),
                public_url: get("LOCAL_STORAGE_URL").unwrap_or_else(|| DEFAULT_LOCAL_STORAGE_URL.into()),
            }
        } else {
            StorageSettings::S3 {
                bucket: get("S3_BUCKET").ok_or(ConfigError::Missing("S3_BUCKET"))?,
                public_url: get("S3_PUBLIC_URL").ok_or(ConfigError::Missing("S3_PUBLIC_URL"))?,
            }
        };

        Ok(Self {
            database_url,
            poll_interval: Duration::from_secs(parse_or(
                &get,
                "WORKER_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            claim_lease: Duration::from_secs(parse_or(
                &get,
                "WORKER_CLAIM_LEASE_SECS",
                DEFAULT_CLAIM_LEASE_SECS,
            )?),
            replicate_api_token: get("REPLICATE_API_TOKEN").unwrap_or_default(),
            replicate_api_url: get("REPLICATE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.into()),
            model_versions,
            default_model_version,
            transparent_model_version: get("REPLICATE_TRANSPARENT_MODEL_VERSION"),
            max_polling_attempts: parse_or(
                &get,
                "REPLICATE_MAX_POLLING_ATTEMPTS",
                DEFAULT_MAX_POLLING_ATTEMPTS,
            )?,
            polling_interval: Duration::from_secs(parse_or(
                &get,
                "REPLICATE_POLLING_INTERVAL",
                DEFAULT_POLLING_INTERVAL.as_secs(),
            )?),
            openai_api_key: get("OPENAI_API_KEY").unwrap_or_default(),
            openai_base_url: get("OPENAI_BASE_URL"),
            openai_model: get("OPENAI_MODEL"),
            chat_pricing_model: get("CHAT_PRICING_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_PRICING_MODEL.into()),
            storage,
            image_width: parse_or(&get, "IMAGE_WIDTH", DEFAULT_IMAGE_WIDTH)?,
            image_height: parse_or(&get, "IMAGE_HEIGHT", DEFAULT_IMAGE_HEIGHT)?,
            default_draw_model: get("DEFAULT_DRAW_MODEL").unwrap_or_else(|| DEFAULT_DRAW_MODEL.into()),
            max_retries: parse_or(&get, "GENERATION_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_delay: Duration::from_secs(parse_or(
                &get,
                "GENERATION_RETRY_DELAY_SECS",
                DEFAULT_RETRY_DELAY_SECS,
            )?),
        })
    }

    pub fn replicate_config(&self) -> ReplicateConfig {
        ReplicateConfig {
            model_versions: self.model_versions.clone(),
            default_version: self.default_model_version.clone(),
            transparent_version: self.transparent_model_version.clone(),
            max_polling_attempts: self.max_polling_attempts,
            polling_interval: self.polling_interval,
            width: self.image_width,
            height: self.image_height,
        }
    }

    pub fn chat_config(&self) -> ChatConfig {
        let mut config = ChatConfig::new(self.openai_api_key.clone());
        if let Some(base_url) = &self.openai_base_url {
            config.base_url = base_url.clone();
        }
        if let Some(model) = &self.openai_model {
            config.model = model.clone();
        }
        config
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            image_width: self.image_width,
            image_height: self.image_height,
            default_model: self.default_draw_model.clone(),
            chat_pricing_model: self.chat_pricing_model.clone(),
        }
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
