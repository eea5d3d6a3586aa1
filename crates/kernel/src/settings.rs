use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

use crate::env_files::{EnvFileLoader, LoadedEnv};

const DEFAULT_ENV: &str = "development";
const ENV_VAR_NAME: &str = "ANNEXX_ENV";
const ROOT_ENV: &str = "ANNEXX_ROOT";
const CONFIG_DIR_ENV: &str = "ANNEXX_CONFIG_DIR";
const ENV_PREFIX: &str = "ANNEXX";

/// Logical database roles configured under `[database.<role>]`.
///
/// Same names and order as `annexx_db::DatabaseRole::ALL`.
pub const DATABASE_ROLES: [&str; 4] = ["primary", "cache", "queue", "cable"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("unsupported environment '{0}'; expected development/test/staging/production")]
    UnsupportedEnvironment(String),

    #[error("invalid server.health_path '{0}': must start with '/' and not overlap /healthz/databases")]
    InvalidHealthPath(String),
}

/// Routes reserved for per-database health reporting.
pub const DATABASE_HEALTH_PREFIX: &str = "/healthz/databases";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            other => Err(SettingsError::UnsupportedEnvironment(other.to_string())),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration for the environment named by `ANNEXX_ENV`.
    ///
    /// Returns the env-file outcome alongside so the caller can log it once
    /// telemetry is initialized.
    pub fn load() -> anyhow::Result<(Self, LoadedEnv)> {
        SettingsLoader::from_process()?.load()
    }
}

/// Resolves where configuration lives and layers it into [`Settings`].
///
/// Layers, lowest precedence first: `config/base.toml`,
/// `config/<environment>.toml`, env files, process variables prefixed
/// `ANNEXX_` (`__` separates nested keys).
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    environment: Environment,
    root: PathBuf,
    config_dir: PathBuf,
}

impl SettingsLoader {
    pub fn new(environment: Environment, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config_dir = root.join("config");
        Self {
            environment,
            root,
            config_dir,
        }
    }

    /// Resolve environment, application root, and config directory from the process.
    pub fn from_process() -> anyhow::Result<Self> {
        let environment: Environment = std::env::var(ENV_VAR_NAME)
            .unwrap_or_else(|_| DEFAULT_ENV.to_string())
            .parse()?;
        let root = match std::env::var(ROOT_ENV) {
            Ok(root) => PathBuf::from(root),
            Err(_) => std::env::current_dir().context("unable to resolve current directory")?,
        };

        let mut loader = Self::new(environment, root);
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            loader = loader.with_config_dir(dir);
        }
        Ok(loader)
    }

    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir = config_dir.into();
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load with the real process environment as the top layer.
    pub fn load(&self) -> anyhow::Result<(Settings, LoadedEnv)> {
        self.load_with(std::env::vars())
    }

    /// Load with `process_vars` standing in for the process environment.
    pub fn load_with<I>(&self, process_vars: I) -> anyhow::Result<(Settings, LoadedEnv)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env_files = EnvFileLoader::new(&self.root).load(self.environment.as_str());

        // Env files never override variables already present in the process.
        let mut variables: config::Map<String, String> = env_files
            .entries()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        variables.extend(process_vars);

        let base_path = self.config_dir.join("base.toml");
        let environment_path = self
            .config_dir
            .join(format!("{}.toml", self.environment.as_str()));

        let mut builder = config::Config::builder();
        for role in DATABASE_ROLES {
            builder = builder
                .set_default(
                    format!("database.{role}.url"),
                    DatabaseSettings::default_url(role),
                )
                .with_context(|| format!("failed to set default url for '{role}'"))?;
        }

        let cfg = builder
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(variables)),
            )
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = self.environment;
        settings.server.validate()?;

        Ok((settings, env_files))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Host used when building absolute links.
    #[serde(default = "ServerSettings::default_public_host")]
    pub public_host: String,
    #[serde(default)]
    pub force_ssl: bool,
    #[serde(default)]
    pub assume_ssl: bool,
    /// Liveness endpoint; requests to it are not logged.
    #[serde(default = "ServerSettings::default_health_path")]
    pub health_path: String,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }

    fn default_public_host() -> String {
        "localhost".to_string()
    }

    fn default_health_path() -> String {
        "/up".to_string()
    }

    /// Reject liveness paths the router cannot mount.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let path = self.health_path.as_str();
        let overlaps = path == DATABASE_HEALTH_PREFIX
            || path
                .strip_prefix(DATABASE_HEALTH_PREFIX)
                .is_some_and(|rest| rest.starts_with('/'));
        if !path.starts_with('/') || overlaps {
            return Err(SettingsError::InvalidHealthPath(path.to_string()));
        }
        Ok(())
    }

    /// Scheme for generated links.
    pub fn protocol(&self) -> &'static str {
        if self.force_ssl {
            "https"
        } else {
            "http"
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            public_host: Self::default_public_host(),
            force_ssl: false,
            assume_ssl: false,
            health_path: Self::default_health_path(),
        }
    }
}

/// One physical database target.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TargetSettings {
    pub url: String,
    #[serde(default = "TargetSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "TargetSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl TargetSettings {
    fn default_max_connections() -> u32 {
        5
    }

    fn default_acquire_timeout_ms() -> u64 {
        5000
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
        }
    }
}

/// Physical target per logical database role.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub primary: TargetSettings,
    pub cache: TargetSettings,
    pub queue: TargetSettings,
    pub cable: TargetSettings,
}

impl DatabaseSettings {
    /// Default sqlite file under `storage/`, created on first connect.
    pub fn default_url(role: &str) -> String {
        format!("sqlite://storage/{role}.sqlite3?mode=rwc")
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            primary: TargetSettings::with_url(Self::default_url("primary")),
            cache: TargetSettings::with_url(Self::default_url("cache")),
            queue: TargetSettings::with_url(Self::default_url("queue")),
            cable: TargetSettings::with_url(Self::default_url("cable")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or `annexx_db=debug`.
    #[serde(default = "TelemetrySettings::default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl TelemetrySettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
