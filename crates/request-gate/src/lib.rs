//! Authorization-gated dispatch of Speak requests.
//!
//! An inbound call is resolved to a registered handler method, checked
//! against the anti-CSRF rules, the session ticket and the method's declared
//! [`AuthzPolicy`], and only then invoked. Every exit path produces one JSON
//! [`Response`](speak_core_types::Response) body.

pub mod antiforgery;
pub mod args;
pub mod authz;
pub mod bootstrap;
pub mod dispatcher;
pub mod errors;
pub mod http;
pub mod ports;
pub mod registry;
pub mod trace;
pub mod translate;

pub use antiforgery::DoubleSubmitValidator;
pub use args::{QueryArgsResolver, DEFAULT_ROUTE_PREFIX};
pub use authz::{AuthResult, AuthorizationGate};
pub use bootstrap::GatewayBootstrap;
pub use dispatcher::{decode_body, Dispatcher, FATAL_ERROR_KEY, GENERIC_ERROR_KEY};
pub use errors::{DispatchError, ForgeryError, HandlerError, HandlerResult};
pub use http::{router, BufferedSink, GatewayState};
pub use ports::{
    AntiForgery, CallerResolver, DenyAllItems, ItemPermissions, KeyTranslator,
    RequestArgsResolver, RequestRepository, ResponseSink, TicketValidator, Translator,
};
pub use registry::{
    AuthzPolicy, HandlerEntry, HandlerRegistry, ItemPermission, MethodDescriptor,
    RoleRequirement, DEFAULT_METHOD,
};
pub use trace::GateTracer;
pub use translate::DictionaryTranslator;
