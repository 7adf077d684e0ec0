use std::sync::Arc;

use axum::Router;
use speak_csrf_rules::CsrfRuleStore;

use crate::antiforgery::DoubleSubmitValidator;
use crate::args::QueryArgsResolver;
use crate::authz::AuthorizationGate;
use crate::dispatcher::Dispatcher;
use crate::http;
use crate::ports::{
    AntiForgery, CallerResolver, DenyAllItems, ItemPermissions, KeyTranslator,
    RequestArgsResolver, RequestRepository, TicketValidator, Translator,
};
use crate::trace::GateTracer;

/// Builder for wiring the dispatcher and its HTTP entry point.
///
/// Only the handler repository and the session collaborators are required;
/// everything else has a working default.
#[derive(Clone)]
pub struct GatewayBootstrap {
    repository: Arc<dyn RequestRepository>,
    tickets: Arc<dyn TicketValidator>,
    callers: Arc<dyn CallerResolver>,
    args: Arc<dyn RequestArgsResolver>,
    csrf: Arc<CsrfRuleStore>,
    anti_forgery: Arc<dyn AntiForgery>,
    items: Arc<dyn ItemPermissions>,
    translator: Arc<dyn Translator>,
    tracer: GateTracer,
}

impl GatewayBootstrap {
    pub fn new(
        repository: Arc<dyn RequestRepository>,
        tickets: Arc<dyn TicketValidator>,
        callers: Arc<dyn CallerResolver>,
    ) -> Self {
        Self {
            repository,
            tickets,
            callers,
            args: Arc::new(QueryArgsResolver::default()),
            csrf: Arc::new(CsrfRuleStore::default()),
            anti_forgery: Arc::new(DoubleSubmitValidator::default()),
            items: Arc::new(DenyAllItems),
            translator: Arc::new(KeyTranslator),
            tracer: GateTracer::default(),
        }
    }

    pub fn with_args_resolver(mut self, args: Arc<dyn RequestArgsResolver>) -> Self {
        self.args = args;
        self
    }

    pub fn with_csrf_rules(mut self, store: Arc<CsrfRuleStore>) -> Self {
        self.csrf = store;
        self
    }

    pub fn with_anti_forgery(mut self, validator: Arc<dyn AntiForgery>) -> Self {
        self.anti_forgery = validator;
        self
    }

    pub fn with_item_permissions(mut self, items: Arc<dyn ItemPermissions>) -> Self {
        self.items = items;
        self
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_tracer(mut self, tracer: GateTracer) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn build_dispatcher(&self) -> Dispatcher {
        Dispatcher {
            args: Arc::clone(&self.args),
            repository: Arc::clone(&self.repository),
            csrf: Arc::clone(&self.csrf),
            anti_forgery: Arc::clone(&self.anti_forgery),
            tickets: Arc::clone(&self.tickets),
            callers: Arc::clone(&self.callers),
            gate: AuthorizationGate::new(Arc::clone(&self.items)),
            translator: Arc::clone(&self.translator),
            tracer: self.tracer.clone(),
        }
    }

    pub fn build_http(&self) -> Router {
        http::router(Arc::new(self.build_dispatcher()))
    }
}
