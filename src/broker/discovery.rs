use async_trait::async_trait;

use crate::broker::{BrokerError, Discovery};
use crate::config::MiddlewareConfig;
use crate::core::server::Server;

/// Discovery backed by a fixed server list, usually taken from config.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    servers: Vec<Server>,
}

impl StaticDiscovery {
    pub fn new(servers: Vec<Server>) -> Self {
        Self { servers }
    }

    pub fn from_config(cfg: &MiddlewareConfig) -> Self {
        Self::new(cfg.servers.clone())
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn list_servers(&self) -> Result<Vec<Server>, BrokerError> {
        if self.servers.is_empty() {
            return Err(BrokerError::NoServers);
        }
        Ok(self.servers.clone())
    }
}
