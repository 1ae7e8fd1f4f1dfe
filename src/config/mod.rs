use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::core::server::{Server, DEFAULT_PORT};
use crate::core::subscription::DEFAULT_DELIVERY_CAPACITY;

/// File used when neither `--config` nor `MWTOOL_CONFIG` names one.
pub const DEFAULT_CONFIG_FILE: &str = "mwtool.toml";

const DEFAULT_SERVER: &str = "127.0.0.1:4222";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct MiddlewareConfig {
    pub servers: Vec<Server>,
    pub connect_timeout: Duration,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub middleware: MiddlewareConfig,
    /// Stable client name presented to the broker.
    pub identity: String,
    pub delivery_capacity: usize,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileConfig {
    middleware: Option<FileMiddleware>,
    identity: Option<FileIdentity>,
    subscriber: Option<FileSubscriber>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileMiddleware {
    servers: Option<Vec<String>>,
    connect_timeout_ms: Option<u64>,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileIdentity {
    certname: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
struct FileSubscriber {
    delivery_capacity: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("config parse error: {0}")]
    Parse(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            middleware: MiddlewareConfig {
                servers: vec![Server::new("127.0.0.1", DEFAULT_PORT)],
                connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
                api_key: None,
            },
            identity: "mwtool".to_string(),
            delivery_capacity: DEFAULT_DELIVERY_CAPACITY,
        }
    }
}

impl Config {
    /// Load configuration from an optional file path and environment variables.
    ///
    /// File values provide defaults, environment variables override.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    /// Like [`Config::load`], with environment lookups going through `env`.
    pub fn load_with<F>(path: Option<&str>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = match config_file(path, &env, |p| p.exists()) {
            Some(p) => fs::read_to_string(p)?,
            None => String::new(),
        };

        Self::parse(&raw, env)
    }

    /// Parse TOML text, applying overrides from `env`.
    pub fn parse<F>(raw: &str, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = toml::from_str(raw)?;
        Self::resolve(file, env)
    }

    fn resolve<F>(file: FileConfig, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let middleware = file.middleware.unwrap_or_default();
        let identity = file.identity.unwrap_or_default();
        let subscriber = file.subscriber.unwrap_or_default();

        // File defaults.
        let mut servers = middleware
            .servers
            .unwrap_or_else(|| vec![DEFAULT_SERVER.to_string()]);
        let mut connect_timeout_ms = middleware
            .connect_timeout_ms
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);
        let mut api_key = middleware.api_key.filter(|k| !k.is_empty());
        let mut certname = identity.certname.filter(|c| !c.is_empty());
        let mut delivery_capacity = subscriber
            .delivery_capacity
            .unwrap_or(DEFAULT_DELIVERY_CAPACITY);

        // Env overrides.
        if let Some(v) = env("MWTOOL_MIDDLEWARE_HOSTS") {
            servers = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(v) = env("MWTOOL_CONNECT_TIMEOUT_MS") {
            connect_timeout_ms = v
                .parse()
                .map_err(|e| ConfigError::Parse(format!("MWTOOL_CONNECT_TIMEOUT_MS: {e}")))?;
        }

        if let Some(v) = env("MWTOOL_API_KEY") {
            api_key = Some(v).filter(|k| !k.is_empty());
        }

        if let Some(v) = env("MWTOOL_CERTNAME") {
            certname = Some(v).filter(|c| !c.is_empty());
        }

        if let Some(v) = env("MWTOOL_DELIVERY_CAPACITY") {
            delivery_capacity = v
                .parse()
                .map_err(|e| ConfigError::Parse(format!("MWTOOL_DELIVERY_CAPACITY: {e}")))?;
        }

        if delivery_capacity == 0 {
            return Err(ConfigError::Parse(
                "delivery_capacity must be at least 1".to_string(),
            ));
        }

        let servers = servers
            .iter()
            .map(|s| {
                s.parse::<Server>()
                    .map_err(|e| ConfigError::Parse(format!("middleware server: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let identity = certname.unwrap_or_else(|| match env("USER") {
            Some(user) if !user.is_empty() => format!("{user}.mcollective"),
            _ => "mwtool".to_string(),
        });

        Ok(Config {
            middleware: MiddlewareConfig {
                servers,
                connect_timeout: Duration::from_millis(connect_timeout_ms),
                api_key,
            },
            identity,
            delivery_capacity,
        })
    }
}

/// Pick the config file: explicit path, then `MWTOOL_CONFIG`, then
/// `mwtool.toml` in the working directory if `exists` says it is there.
fn config_file<F, E>(explicit: Option<&str>, env: &F, exists: E) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
    E: Fn(&Path) -> bool,
{
    explicit
        .map(PathBuf::from)
        .or_else(|| env("MWTOOL_CONFIG").filter(|p| !p.is_empty()).map(PathBuf::from))
        .or_else(|| {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            exists(default).then(|| default.to_path_buf())
        })
}
