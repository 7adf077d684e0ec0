//! Gateway configuration: a YAML file layered under `SPEAK_GATEWAY_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use speak_csrf_rules::{ConfigProvider, ANTI_CSRF_SECTION};
use speak_request_gate::DEFAULT_ROUTE_PREFIX;
use speak_session_store::{ItemGrant, TicketSeed};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "config/gateway.yaml";
pub const ENV_PREFIX: &str = "SPEAK_GATEWAY";
pub const DEFAULT_BIND: &str = "127.0.0.1:8790";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerSection,
    /// Raw anti-CSRF tree; parsed by `speak-csrf-rules`.
    pub anti_csrf: Value,
    pub tickets: Vec<TicketSeed>,
    pub items: Vec<ItemGrant>,
    pub translations: Vec<Translation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub route_prefix: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
        }
    }
}

/// Translation keys contain dots, so they are listed rather than mapped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub key: String,
    pub text: String,
}

impl ConfigProvider for GatewayConfig {
    fn section(&self, name: &str) -> Option<Value> {
        if name == ANTI_CSRF_SECTION {
            return (!self.anti_csrf.is_null()).then(|| self.anti_csrf.clone());
        }
        serde_json::to_value(self).ok()?.section(name)
    }
}

pub struct LoadedConfig {
    pub config: GatewayConfig,
    pub path: Option<PathBuf>,
}

/// Resolves which file to read: an explicit path must exist, the default
/// path is used only when present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let local = PathBuf::from(DEFAULT_CONFIG_PATH);
            local.exists().then_some(local)
        }
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = resolve_config_path(explicit);
    let mut builder = ::config::Config::builder();
    match &path {
        Some(path) => {
            builder = builder.add_source(::config::File::from(path.as_path()).required(true));
        }
        None => warn!(
            "Config file not found, using defaults: {}",
            DEFAULT_CONFIG_PATH
        ),
    }
    builder = builder.add_source(
        ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__"),
    );

    let config: GatewayConfig = builder
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Failed to parse configuration")?;

    if let Some(path) = &path {
        info!("Loaded configuration from: {}", path.display());
    }
    Ok(LoadedConfig { config, path })
}
