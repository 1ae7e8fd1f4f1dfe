//! Command line surface: the command registry, dispatcher and the commands
//! shipped with the tool.

pub mod commands;
pub mod registry;

use clap::ArgMatches;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigError};

pub use self::registry::{Command, Dispatcher, Registry};

/// Per-invocation state handed to every command.
#[derive(Debug, Clone)]
pub struct AppContext {
    config_path: Option<String>,
    config: Option<Config>,
    cancel: CancellationToken,
}

impl AppContext {
    pub fn new(config_path: Option<String>, cancel: CancellationToken) -> Self {
        Self {
            config_path,
            config: None,
            cancel,
        }
    }

    /// Context with an already resolved configuration.
    pub fn with_config(config: Config, cancel: CancellationToken) -> Self {
        Self {
            config_path: None,
            config: Some(config),
            cancel,
        }
    }

    /// Configuration for commands that need one. Loaded on demand so that
    /// commands such as `buildinfo` work without a config file.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => Config::load(self.config_path.as_deref()),
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Value of the global `--config` flag wherever it was given on the line.
pub fn config_path(matches: &ArgMatches) -> Option<String> {
    let mut found = matches.get_one::<String>("config").cloned();
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        if let Some(path) = sub.get_one::<String>("config") {
            found = Some(path.clone());
        }
        current = sub;
    }
    found
}

/// Registry with every command the tool ships.
pub fn default_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_group("tool", "Middleware diagnostic utilities")
        .register(Box::new(commands::sub::SubCommand))
        .register(Box::new(commands::buildinfo::BuildInfoCommand));
    registry
}
