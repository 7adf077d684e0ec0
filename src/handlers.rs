//! Request handlers shipped with the gateway itself.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use speak_core_types::{RequestArgs, Response};
use speak_csrf_rules::CsrfRuleStore;
use speak_request_gate::{
    AuthzPolicy, HandlerRegistry, HandlerResult, RoleRequirement, DEFAULT_METHOD,
};
use tracing::warn;

use crate::config::load_config;

pub const PING_HANDLER: &str = "Gateway.Ping";
pub const RULES_HANDLER: &str = "Gateway.Rules";
pub const RELOAD_METHOD: &str = "Reload";

/// Re-reads the configuration and swaps in a fresh CSRF rule snapshot.
pub struct RuleReloader {
    path: Option<PathBuf>,
    store: Arc<CsrfRuleStore>,
}

impl RuleReloader {
    pub fn new(path: Option<PathBuf>, store: Arc<CsrfRuleStore>) -> Self {
        Self { path, store }
    }

    pub fn store(&self) -> &Arc<CsrfRuleStore> {
        &self.store
    }

    pub fn reload(&self) -> Result<u64> {
        let loaded = load_config(self.path.as_deref())?;
        Ok(self.store.reload(&loaded.config))
    }

    /// A failed reload leaves the current snapshot in place.
    pub fn reload_or_keep(&self) -> Option<u64> {
        match self.reload() {
            Ok(revision) => Some(revision),
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    revision = self.store.revision(),
                    "csrf rule reload failed; keeping previous snapshot"
                );
                None
            }
        }
    }
}

pub fn register_builtin(registry: &HandlerRegistry, reloader: Arc<RuleReloader>) {
    registry.register(PING_HANDLER, DEFAULT_METHOD, AuthzPolicy::none(), ping);

    let listing = Arc::clone(reloader.store());
    registry.register(
        RULES_HANDLER,
        DEFAULT_METHOD,
        AuthzPolicy::none().with_role(RoleRequirement::default()),
        move |_args| list_rules(Arc::clone(&listing)),
    );

    registry.register(
        RULES_HANDLER,
        RELOAD_METHOD,
        AuthzPolicy::admins_only(),
        move |_args| reload_rules(Arc::clone(&reloader)),
    );
}

async fn ping(_args: RequestArgs) -> HandlerResult {
    let server_time = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(Response::ok()
        .with_value("pong", json!(true))
        .with_value("serverTime", json!(server_time)))
}

async fn list_rules(store: Arc<CsrfRuleStore>) -> HandlerResult {
    let rules = store.snapshot();
    Ok(Response::ok()
        .with_value("revision", json!(store.revision()))
        .with_value("rules", serde_json::to_value(rules.summary())?))
}

async fn reload_rules(reloader: Arc<RuleReloader>) -> HandlerResult {
    let worker = Arc::clone(&reloader);
    let revision = tokio::task::spawn_blocking(move || worker.reload()).await??;
    let count = reloader.store().snapshot().len();
    Ok(Response::ok()
        .with_value("revision", json!(revision))
        .with_value("count", json!(count)))
}
