//! Seed definitions for sessions and item grants.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A session ticket created at startup.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketSeed {
    pub id: String,
    pub user: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub administrator: bool,
    /// `humantime` duration such as `8h`, or `session` for no expiry.
    #[serde(default)]
    pub ttl: Option<String>,
}

/// Rights on one item granted to accounts or roles.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemGrant {
    /// Item id or content path.
    pub item: String,
    pub rights: Vec<String>,
    #[serde(default)]
    pub to: Vec<String>,
}

/// Errors surfaced while loading seeds or building stores.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to deserialize seeds: {0}")]
    Deserialize(String),
    #[error("invalid ttl format: {0}")]
    InvalidTtl(String),
    #[error("grant on `{item}` is invalid: {reason}")]
    InvalidGrant { item: String, reason: String },
}

pub fn load_seeds_from_reader<T: DeserializeOwned, R: Read>(mut reader: R) -> Result<T, SessionError> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    parse_seeds_str(&buf)
}

pub fn load_seeds_from_path<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, SessionError> {
    let file = File::open(path.as_ref())?;
    load_seeds_from_reader(file)
}

/// Accepts JSON first, then YAML.
pub fn parse_seeds_str<T: DeserializeOwned>(raw: &str) -> Result<T, SessionError> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            SessionError::Deserialize(format!("json error: {}; yaml error: {}", json_err, yaml_err))
        }),
    }
}
