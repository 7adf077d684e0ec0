use std::any::Any;
use std::borrow::Cow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use speak_core_types::{InboundRequest, Response};
use speak_csrf_rules::CsrfRuleStore;
use tracing::{debug, error, Instrument};

use crate::authz::{AuthResult, AuthorizationGate};
use crate::errors::DispatchError;
use crate::ports::{
    AntiForgery, CallerResolver, RequestArgsResolver, RequestRepository, ResponseSink,
    TicketValidator, Translator,
};
use crate::trace::GateTracer;

/// Localization key of the message returned on every security denial.
pub const GENERIC_ERROR_KEY: &str = "An error occurred.";
/// Localization key of the message returned when a fault reaches the boundary.
pub const FATAL_ERROR_KEY: &str = "A serious error occurred please contact the administrator";

const LAST_RESORT_BODY: &str = r#"{"error":true}"#;

/// Runs the gated pipeline for one call at a time; shared across requests.
pub struct Dispatcher {
    pub(crate) args: Arc<dyn RequestArgsResolver>,
    pub(crate) repository: Arc<dyn RequestRepository>,
    pub(crate) csrf: Arc<CsrfRuleStore>,
    pub(crate) anti_forgery: Arc<dyn AntiForgery>,
    pub(crate) tickets: Arc<dyn TicketValidator>,
    pub(crate) callers: Arc<dyn CallerResolver>,
    pub(crate) gate: AuthorizationGate,
    pub(crate) translator: Arc<dyn Translator>,
    pub(crate) tracer: GateTracer,
}

impl Dispatcher {
    /// Outer entry point.
    ///
    /// Writes exactly one body to `sink` and ends it exactly once, whatever
    /// happens inside the pipeline, including a panicking handler.
    pub async fn handle(&self, request: &InboundRequest, sink: &mut dyn ResponseSink) {
        let span = self.tracer.span(&request.raw_url, &request.request_id);
        let mut out = EndGuard { sink };
        async {
            let outcome = AssertUnwindSafe(self.process(request)).catch_unwind().await;
            let body = match outcome {
                Ok(Ok(body)) => body,
                Ok(Err(fault)) => self.fatal_body(request, &fault),
                Err(panic) => {
                    let fault = DispatchError::Panicked(panic_message(panic.as_ref()).into_owned());
                    self.fatal_body(request, &fault)
                }
            };
            out.write(&body);
        }
        .instrument(span)
        .await
    }

    /// The pipeline proper: resolve, check, invoke, serialize, decode.
    ///
    /// Security denials come back as `Ok` with the generic error envelope.
    /// Everything else that goes wrong is an `Err` for the outer boundary.
    pub async fn process(&self, request: &InboundRequest) -> Result<String, DispatchError> {
        let url = request.raw_url.as_str();
        let args = self
            .args
            .create(request)
            .ok_or_else(|| DispatchError::MissingArgs { url: url.to_string() })?;
        let handler = self
            .repository
            .get(&args)
            .ok_or_else(|| DispatchError::MissingHandler { url: url.to_string() })?;

        let rules = self.csrf.snapshot();
        if rules.is_exempt(url) {
            debug!(url, "anti-forgery validation skipped by csrf rule");
        } else {
            self.anti_forgery.validate(request)?;
        }

        if !self.tickets.is_current_ticket_valid(request).await {
            error!(url, "User ticket is not valid");
            return self.render(&self.generic_error());
        }

        let method = handler
            .method(&args.method_name)
            .ok_or_else(|| DispatchError::MethodNotFound {
                handler: handler.type_name().to_string(),
                method: args.method_name.clone(),
            })?;

        let caller = self.callers.current_user(request).await;
        if let AuthResult::Denied(reason) = self.gate.authorize(&caller, method).await {
            error!(url, caller = %caller, target = method.qualified_name(), "{reason}");
            return self.render(&self.generic_error());
        }

        debug!(caller = %caller, target = method.qualified_name(), "invoking handler");
        let response = method
            .invoke(args)
            .await
            .map_err(|source| DispatchError::Handler {
                target: method.qualified_name().to_string(),
                source,
            })?;
        self.render(&response)
    }

    fn generic_error(&self) -> Response {
        Response::failure(self.translator.translate(GENERIC_ERROR_KEY))
    }

    fn render(&self, response: &Response) -> Result<String, DispatchError> {
        let serialized = serde_json::to_string(response)?;
        Ok(decode_body(&serialized))
    }

    fn fatal_body(&self, request: &InboundRequest, fault: &DispatchError) -> String {
        if fault.is_precondition() {
            error!(url = %request.raw_url, error = %fault, "request could not be routed");
        } else {
            error!(url = %request.raw_url, error = %fault, "request failed");
        }
        let response = Response::failure(self.translator.translate(FATAL_ERROR_KEY));
        serde_json::to_string(&response).unwrap_or_else(|_| LAST_RESORT_BODY.to_string())
    }
}

/// URL-decodes a serialized response body.
///
/// `+` becomes a space and `%XX` sequences are decoded; malformed sequences
/// are kept as they are. Text without either is returned unchanged.
pub fn decode_body(serialized: &str) -> String {
    let spaced = serialized.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

fn panic_message(payload: &(dyn Any + Send)) -> Cow<'_, str> {
    if let Some(message) = payload.downcast_ref::<&str>() {
        Cow::Borrowed(message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        Cow::Borrowed(message.as_str())
    } else {
        Cow::Borrowed("non-string panic payload")
    }
}

/// Ends the sink when dropped, so every exit path closes the response.
struct EndGuard<'a> {
    sink: &'a mut dyn ResponseSink,
}

impl EndGuard<'_> {
    fn write(&mut self, body: &str) {
        self.sink.write(body);
    }
}

impl Drop for EndGuard<'_> {
    fn drop(&mut self) {
        self.sink.flush_and_end();
    }
}
