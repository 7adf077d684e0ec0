use std::borrow::Cow;

use tracing::{span, Level, Span};

#[derive(Clone)]
pub struct GateTracer {
    pub component: Cow<'static, str>,
}

impl GateTracer {
    pub fn new(component: impl Into<Cow<'static, str>>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn span(&self, url: &str, request_id: &str) -> Span {
        span!(
            Level::INFO,
            "speak.dispatch",
            url = url,
            request_id = request_id,
            component = %self.component
        )
    }
}

impl Default for GateTracer {
    fn default() -> Self {
        Self::new("speak-request-gate")
    }
}
