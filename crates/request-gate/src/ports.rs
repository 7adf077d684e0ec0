use std::sync::Arc;

use async_trait::async_trait;
use speak_core_types::{AccessRight, Caller, InboundRequest, ItemRef, RequestArgs};

use crate::errors::ForgeryError;
use crate::registry::HandlerEntry;

/// Turns a raw inbound call into structured arguments.
pub trait RequestArgsResolver: Send + Sync {
    fn create(&self, request: &InboundRequest) -> Option<RequestArgs>;
}

/// Finds the handler able to service a set of arguments.
pub trait RequestRepository: Send + Sync {
    fn get(&self, args: &RequestArgs) -> Option<Arc<HandlerEntry>>;
}

/// Generic anti-forgery token validation.
pub trait AntiForgery: Send + Sync {
    fn validate(&self, request: &InboundRequest) -> Result<(), ForgeryError>;
}

#[async_trait]
pub trait TicketValidator: Send + Sync {
    async fn is_current_ticket_valid(&self, request: &InboundRequest) -> bool;
}

#[async_trait]
pub trait CallerResolver: Send + Sync {
    async fn current_user(&self, request: &InboundRequest) -> Caller;
}

#[async_trait]
pub trait ItemPermissions: Send + Sync {
    async fn has_access(&self, caller: &Caller, item: &ItemRef, right: AccessRight) -> bool;
}

pub trait Translator: Send + Sync {
    fn translate(&self, key: &str) -> String;
}

/// Host response carrier.
///
/// The dispatcher writes exactly one body and then ends the response once.
pub trait ResponseSink: Send {
    fn write(&mut self, body: &str);
    fn flush_and_end(&mut self);
}

/// Returns every key untranslated.
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Grants no item rights to anyone.
pub struct DenyAllItems;

#[async_trait]
impl ItemPermissions for DenyAllItems {
    async fn has_access(&self, _caller: &Caller, _item: &ItemRef, _right: AccessRight) -> bool {
        false
    }
}
