//! Gateway address store backed by the YAML config file.

use super::{GatewayAddress, GatewayConfigStore, HostError};
use async_trait::async_trait;
use par_remote_config::{Config, GatewayConfig};
use parking_lot::Mutex;
use std::path::PathBuf;

/// [`GatewayConfigStore`] reading and writing `gateway:` in the config.
///
/// With no path set the store is memory-only, which is what tests use.
pub struct ConfigGatewayStore {
    config: Mutex<Config>,
    path: Option<PathBuf>,
}

impl ConfigGatewayStore {
    /// Store persisting to `path` on every change
    pub fn new(config: Config, path: impl Into<PathBuf>) -> Self {
        Self {
            config: Mutex::new(config),
            path: Some(path.into()),
        }
    }

    /// Store persisting to the default config location
    pub fn with_default_path(config: Config) -> Self {
        Self::new(config, Config::config_path())
    }

    pub fn in_memory(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
            path: None,
        }
    }

    /// Snapshot of the current config
    pub fn config(&self) -> Config {
        self.config.lock().clone()
    }
}

#[async_trait]
impl GatewayConfigStore for ConfigGatewayStore {
    async fn gateway_address(&self) -> Result<GatewayAddress, HostError> {
        let config = self.config.lock();
        Ok(GatewayAddress::new(
            config.gateway.host.clone(),
            config.gateway.port,
        ))
    }

    async fn set_gateway_address(&self, address: GatewayAddress) -> Result<(), HostError> {
        if address.host.trim().is_empty() {
            return Err(HostError::InvalidArgument(
                "gateway host cannot be empty".to_string(),
            ));
        }
        if address.port == 0 {
            return Err(HostError::InvalidArgument(
                "gateway port must be nonzero".to_string(),
            ));
        }

        let snapshot = {
            let mut config = self.config.lock();
            config.gateway = GatewayConfig {
                host: address.host.clone(),
                port: address.port,
            };
            config.clone()
        };

        if let Some(path) = &self.path {
            let path = path.clone();
            tokio::task::spawn_blocking(move || snapshot.save_to(&path))
                .await
                .map_err(|e| HostError::Failed(format!("config save task failed: {e}")))?
                .map_err(|e| HostError::Failed(format!("failed to save config: {e:#}")))?;
        }

        log::info!("Gateway address set to {}", address);
        Ok(())
    }
}
