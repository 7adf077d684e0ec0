//! Speak gateway: the authorization-gated request dispatcher served over HTTP.
//!
//! Exposes modules for integration testing

pub mod cli;
pub mod config;
pub mod gateway;
pub mod handlers;

pub use config::{load_config, GatewayConfig, LoadedConfig};
pub use gateway::Gateway;
