use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use speak_core_types::{Caller, InboundRequest};
use speak_request_gate::{CallerResolver, TicketValidator};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::{SessionError, TicketSeed};
use crate::parse_ttl;

pub const TICKET_COOKIE: &str = "sitecore_userticket";
pub const TICKET_HEADER: &str = "X-Speak-Ticket";

#[derive(Clone)]
struct TicketEntry {
    caller: Caller,
    expires_at: Option<Instant>,
}

impl TicketEntry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

/// Session tickets keyed by id.
///
/// The id is read from the ticket cookie, or from the ticket header when no
/// cookie is sent. Expired tickets are dropped when they are looked up.
pub struct InMemoryTicketStore {
    tickets: DashMap<String, TicketEntry>,
    cookie_name: String,
    header_name: String,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::with_names(TICKET_COOKIE, TICKET_HEADER)
    }

    pub fn with_names(cookie_name: impl Into<String>, header_name: impl Into<String>) -> Self {
        Self {
            tickets: DashMap::new(),
            cookie_name: cookie_name.into(),
            header_name: header_name.into(),
        }
    }

    pub fn from_seeds(seeds: &[TicketSeed]) -> Result<Self, SessionError> {
        let store = Self::new();
        store.seed(seeds)?;
        Ok(store)
    }

    /// Adds every seed, or none of them when one carries a bad ttl.
    pub fn seed(&self, seeds: &[TicketSeed]) -> Result<usize, SessionError> {
        let parsed = seeds
            .iter()
            .map(|seed| parse_ttl(seed.ttl.as_deref()).map(|ttl| (seed, ttl)))
            .collect::<Result<Vec<_>, _>>()?;
        for (seed, ttl) in &parsed {
            let mut caller = Caller::new(seed.user.clone()).with_roles(seed.roles.clone());
            if seed.administrator {
                caller = caller.administrator();
            }
            self.insert(seed.id.clone(), caller, *ttl);
        }
        info!(tickets = parsed.len(), "session tickets seeded");
        Ok(parsed.len())
    }

    pub fn insert(&self, id: impl Into<String>, caller: Caller, ttl: Option<Duration>) {
        let entry = TicketEntry {
            caller,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.tickets.insert(id.into(), entry);
    }

    /// Creates a ticket with a fresh random id.
    pub fn issue(&self, caller: Caller, ttl: Option<Duration>) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.insert(id.clone(), caller, ttl);
        id
    }

    pub fn revoke(&self, id: &str) -> bool {
        self.tickets.remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.tickets.len();
        self.tickets.retain(|_, entry| !entry.is_expired());
        before - self.tickets.len()
    }

    pub fn ticket_id(&self, request: &InboundRequest) -> Option<String> {
        request
            .cookie(&self.cookie_name)
            .or_else(|| request.header(&self.header_name).map(str::to_string))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    pub fn lookup(&self, id: &str) -> Option<Caller> {
        let entry = self.tickets.get(id).map(|entry| entry.clone())?;
        if entry.is_expired() {
            self.tickets.remove(id);
            debug!(ticket = id, "expired session ticket dropped");
            return None;
        }
        Some(entry.caller)
    }

    fn caller_for(&self, request: &InboundRequest) -> Option<Caller> {
        self.ticket_id(request).and_then(|id| self.lookup(&id))
    }
}

impl Default for InMemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TicketValidator for InMemoryTicketStore {
    async fn is_current_ticket_valid(&self, request: &InboundRequest) -> bool {
        self.caller_for(request).is_some()
    }
}

#[async_trait]
impl CallerResolver for InMemoryTicketStore {
    async fn current_user(&self, request: &InboundRequest) -> Caller {
        self.caller_for(request).unwrap_or_else(Caller::anonymous)
    }
}
