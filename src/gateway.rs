use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use speak_csrf_rules::{load_rules, CsrfRuleStore};
use speak_request_gate::{
    DictionaryTranslator, Dispatcher, DoubleSubmitValidator, GateTracer, GatewayBootstrap,
    HandlerRegistry, QueryArgsResolver,
};
use speak_session_store::{load_seeds_from_path, InMemoryTicketStore, ItemAccessTable, TicketSeed};
use tracing::info;

use crate::config::LoadedConfig;
use crate::handlers::{register_builtin, RuleReloader};

/// Fully wired gateway: collaborators built from configuration plus the
/// built-in handlers.
pub struct Gateway {
    registry: Arc<HandlerRegistry>,
    tickets: Arc<InMemoryTicketStore>,
    items: Arc<ItemAccessTable>,
    reloader: Arc<RuleReloader>,
    bootstrap: GatewayBootstrap,
}

impl Gateway {
    pub fn from_config(loaded: &LoadedConfig, rules: Arc<CsrfRuleStore>) -> Result<Self> {
        let config = &loaded.config;
        rules.replace(load_rules(config));

        let tickets = Arc::new(
            InMemoryTicketStore::from_seeds(&config.tickets)
                .context("invalid ticket seeds in configuration")?,
        );
        let items = Arc::new(
            ItemAccessTable::from_grants(&config.items)
                .context("invalid item grants in configuration")?,
        );
        let translator: DictionaryTranslator = config
            .translations
            .iter()
            .map(|entry| (entry.key.clone(), entry.text.clone()))
            .collect();

        let reloader = Arc::new(RuleReloader::new(loaded.path.clone(), Arc::clone(&rules)));
        let registry = Arc::new(HandlerRegistry::new());
        register_builtin(&registry, Arc::clone(&reloader));

        let bootstrap = GatewayBootstrap::new(registry.clone(), tickets.clone(), tickets.clone())
            .with_args_resolver(Arc::new(QueryArgsResolver::new(
                config.server.route_prefix.clone(),
            )))
            .with_csrf_rules(rules)
            .with_anti_forgery(Arc::new(DoubleSubmitValidator::from_section(&config.anti_csrf)))
            .with_item_permissions(items.clone())
            .with_translator(Arc::new(translator))
            .with_tracer(GateTracer::new("speak-gateway"));

        info!(
            handlers = registry.type_names().len(),
            tickets = tickets.len(),
            "gateway assembled"
        );
        Ok(Self {
            registry,
            tickets,
            items,
            reloader,
            bootstrap,
        })
    }

    /// Adds sessions from a JSON or YAML list of ticket seeds.
    pub fn seed_tickets_from_file(&self, path: &Path) -> Result<usize> {
        let seeds: Vec<TicketSeed> = load_seeds_from_path(path)
            .with_context(|| format!("failed to read ticket seeds from {}", path.display()))?;
        let added = self
            .tickets
            .seed(&seeds)
            .with_context(|| format!("invalid ticket seeds in {}", path.display()))?;
        info!(added, path = %path.display(), "ticket seeds loaded");
        Ok(added)
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn tickets(&self) -> &Arc<InMemoryTicketStore> {
        &self.tickets
    }

    pub fn items(&self) -> &Arc<ItemAccessTable> {
        &self.items
    }

    pub fn reloader(&self) -> &Arc<RuleReloader> {
        &self.reloader
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.bootstrap.build_dispatcher()
    }

    pub fn router(&self) -> Router {
        self.bootstrap.build_http()
    }
}
