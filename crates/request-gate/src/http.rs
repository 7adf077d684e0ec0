use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use speak_core_types::InboundRequest;

use crate::dispatcher::Dispatcher;
use crate::ports::ResponseSink;

#[derive(Clone)]
pub struct GatewayState {
    dispatcher: Arc<Dispatcher>,
}

impl GatewayState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub(crate) fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }
}

/// Every path other than `/healthz` goes through the dispatcher.
pub fn router_with_state(state: GatewayState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .fallback(dispatch_handler)
        .with_state(state)
}

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    router_with_state(GatewayState::new(dispatcher))
}

async fn healthz_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn dispatch_handler(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let raw_url = uri
        .path_and_query()
        .map(|value| value.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    let request = InboundRequest::new(method.as_str(), raw_url, headers, body.to_vec());
    let mut sink = BufferedSink::default();
    state.dispatcher().handle(&request, &mut sink).await;
    sink.into_response(&request.request_id)
}

/// Collects the body in memory and hands it to axum once ended.
#[derive(Default)]
pub struct BufferedSink {
    body: String,
    ends: usize,
}

impl BufferedSink {
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_ended(&self) -> bool {
        self.ends > 0
    }

    fn into_response(self, request_id: &str) -> Response {
        let mut response = (StatusCode::OK, self.body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        if let Ok(value) = HeaderValue::from_str(request_id) {
            headers.insert("x-request-id", value);
        }
        response
    }
}

impl ResponseSink for BufferedSink {
    fn write(&mut self, body: &str) {
        self.body.push_str(body);
    }

    fn flush_and_end(&mut self) {
        self.ends += 1;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use speak_core_types::{Caller, Response as SpeakResponse};
    use tower::ServiceExt;

    use super::*;
    use crate::bootstrap::GatewayBootstrap;
    use crate::ports::{CallerResolver, TicketValidator};
    use crate::registry::{AuthzPolicy, HandlerRegistry};

    struct OpenSession;

    #[async_trait]
    impl TicketValidator for OpenSession {
        async fn is_current_ticket_valid(&self, _request: &InboundRequest) -> bool {
            true
        }
    }

    #[async_trait]
    impl CallerResolver for OpenSession {
        async fn current_user(&self, _request: &InboundRequest) -> Caller {
            Caller::new("sitecore\\jane")
        }
    }

    fn test_router() -> Router {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register("Gateway.Ping", "ProcessRequest", AuthzPolicy::none(), |_args| async {
            Ok(SpeakResponse::ok().with_value("pong", json!(true)))
        });
        GatewayBootstrap::new(registry, Arc::new(OpenSession), Arc::new(OpenSession)).build_http()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let response = test_router()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn unmatched_paths_are_dispatched() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/-/speak/request/v1/expeditor/Gateway.Ping")
                    .header("x-request-id", "req-7")
                    .header("cookie", "__RequestVerificationToken=t")
                    .header("X-RequestVerificationToken", "t")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-7");
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        let body = body_json(response).await;
        assert_eq!(body["error"], false);
        assert_eq!(body["pong"], true);
    }

    #[tokio::test]
    async fn routing_failures_still_answer_200_with_error_body() {
        let response = test_router()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(
            body["errorMessage"],
            "A serious error occurred please contact the administrator"
        );
    }
}
