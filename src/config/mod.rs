use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable that may name the config file instead of `--config`
pub const CONFIG_PATH_ENV: &str = "APP_CONFIG";

/// Prefix for environment variables overriding individual settings
pub const ENV_PREFIX: &str = "SIGNUP";

/// Region value selecting the local stand-in for an AWS service
pub const LOCAL_REGION: &str = "LOCAL";

/// Storage region value selecting the in-process store
pub const MEMORY_REGION: &str = "MEMORY";

/// Unprefixed variables honoured for the welcome page, with the key each sets
pub const LEGACY_ENV_ALIASES: &[(&str, &str)] = &[("THEME", "theme"), ("FLASK_DEBUG", "debug")];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Cannot specify --config when the {env} environment variable is set")]
    ConflictingSources { env: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub page: PageConfig,
    pub storage: StorageConfig,
    pub notification: NotificationConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Settings baked into the welcome page
#[derive(Debug, Clone, Deserialize)]
pub struct PageConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_region")]
    pub dynamodb_region: String,
    #[serde(default = "default_signups_table")]
    pub signups_table: String,
    #[serde(default = "default_key_attribute")]
    pub key_attribute: String,
    #[serde(default = "default_local_db_host")]
    pub local_db_host: String,
    #[serde(default = "default_local_db_port")]
    pub local_db_port: u16,
    #[serde(default = "default_local_db_name")]
    pub local_db_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_region")]
    pub sns_region: String,
    #[serde(default)]
    pub signup_topic: String,
    #[serde(default = "default_subject_field")]
    pub subject_field: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

/// Where signup records are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Aws { region: String },
    LocalDynamoDb { endpoint: String, access_key: String },
    InMemory,
}

/// Where signup notifications are sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierBackend {
    Sns { region: String },
    Console,
}

impl Config {
    /// Load configuration from defaults, an optional config file, the
    /// unprefixed `THEME`/`FLASK_DEBUG` variables and `SIGNUP_*` environment
    /// variables, in that order of precedence.
    ///
    /// The file comes from `config_path` (the `--config` flag) or from
    /// `APP_CONFIG`; naming it both ways is an error.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        info!("Loading configuration from file and environment");

        let path = resolve_config_path(config_path, std::env::var(CONFIG_PATH_ENV).ok())?;
        Self::from_sources(
            path.as_deref(),
            [
                legacy_environment(std::env::vars()),
                config::Environment::with_prefix(ENV_PREFIX),
            ],
        )
    }

    /// Build configuration from an explicit file and environment layers,
    /// later layers overriding earlier ones
    pub fn from_sources(
        path: Option<&Path>,
        environments: impl IntoIterator<Item = config::Environment>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Reading config file: {}", path.display());
            builder = builder.add_source(config::File::from(path).required(true));
        }
        for environment in environments {
            builder = builder.add_source(environment);
        }

        let settings = builder
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load settings: {}", e),
            })?;

        let config = Config {
            server: section(&settings, "server")?,
            page: section(&settings, "page")?,
            storage: section(&settings, "storage")?,
            notification: section(&settings, "notification")?,
            observability: section(&settings, "observability")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.storage.signups_table.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Signups table name cannot be empty".to_string(),
            });
        }

        if self.storage.key_attribute.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Key attribute cannot be empty".to_string(),
            });
        }

        if self.notification.subject_field.is_empty() {
            return Err(ConfigError::ValidationError {
                message: "Subject field cannot be empty".to_string(),
            });
        }

        if self.notification.signup_topic.is_empty()
            && self.notification.backend() != NotifierBackend::Console
        {
            return Err(ConfigError::ValidationError {
                message: "Signup topic is required when publishing to SNS".to_string(),
            });
        }

        Ok(())
    }
}

impl StorageConfig {
    pub fn backend(&self) -> StorageBackend {
        if self.dynamodb_region.eq_ignore_ascii_case(LOCAL_REGION) {
            StorageBackend::LocalDynamoDb {
                endpoint: format!("http://{}:{}", self.local_db_host, self.local_db_port),
                access_key: self.local_db_name.clone(),
            }
        } else if self.dynamodb_region.eq_ignore_ascii_case(MEMORY_REGION) {
            StorageBackend::InMemory
        } else {
            StorageBackend::Aws {
                region: self.dynamodb_region.clone(),
            }
        }
    }
}

impl NotificationConfig {
    pub fn backend(&self) -> NotifierBackend {
        if self.sns_region.eq_ignore_ascii_case(LOCAL_REGION) {
            NotifierBackend::Console
        } else {
            NotifierBackend::Sns {
                region: self.sns_region.clone(),
            }
        }
    }
}

/// Environment source holding only the unprefixed aliases found in `vars`
pub fn legacy_environment(
    vars: impl IntoIterator<Item = (String, String)>,
) -> config::Environment {
    let source: HashMap<String, String> = vars
        .into_iter()
        .filter_map(|(name, value)| {
            LEGACY_ENV_ALIASES
                .iter()
                .find(|(alias, _)| *alias == name)
                .map(|(_, key)| (key.to_uppercase(), value))
        })
        .collect();

    config::Environment::default().source(Some(source))
}

/// Pick the config file from the CLI flag or the environment, never both
pub fn resolve_config_path(
    cli_path: Option<PathBuf>,
    env_path: Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    match (cli_path, env_path) {
        (Some(_), Some(_)) => Err(ConfigError::ConflictingSources {
            env: CONFIG_PATH_ENV.to_string(),
        }),
        (Some(path), None) => Ok(Some(path)),
        (None, Some(path)) => Ok(Some(PathBuf::from(path))),
        (None, None) => Ok(None),
    }
}

fn section<T: serde::de::DeserializeOwned>(
    settings: &config::Config,
    name: &str,
) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", name, e),
        })
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    5000
}

pub(crate) fn default_theme() -> String {
    "default".to_string()
}

pub(crate) fn default_region() -> String {
    "us-east-1".to_string()
}

pub(crate) fn default_signups_table() -> String {
    "signups".to_string()
}

pub(crate) fn default_key_attribute() -> String {
    "email".to_string()
}

pub(crate) fn default_local_db_host() -> String {
    "localhost".to_string()
}

pub(crate) fn default_local_db_port() -> u16 {
    8000
}

pub(crate) fn default_local_db_name() -> String {
    "local".to_string()
}

pub(crate) fn default_subject_field() -> String {
    "feedback".to_string()
}

pub(crate) fn default_service_name() -> String {
    "signup-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
