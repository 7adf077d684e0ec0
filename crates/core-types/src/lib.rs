//! Shared primitives for the Speak gateway crates.
//!
//! Everything here is request scoped: an [`InboundRequest`] comes in, the
//! argument resolver turns it into [`RequestArgs`], a handler produces a
//! [`Response`], and the [`Caller`] travels alongside for authorization.

use std::collections::BTreeMap;
use std::fmt;

use http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Account name used when no valid session identifies the caller.
pub const ANONYMOUS_USER: &str = "extranet\\Anonymous";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Shared error type for malformed primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown access right: {0}")]
    UnknownAccessRight(String),
}

/// Inbound HTTP call as seen by the dispatch pipeline.
#[derive(Clone, Debug)]
pub struct InboundRequest {
    pub request_id: String,
    pub method: String,
    /// Path and query exactly as received.
    pub raw_url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(
        method: impl Into<String>,
        raw_url: impl Into<String>,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Self {
        let request_id = headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            request_id,
            method: method.into(),
            raw_url: raw_url.into(),
            headers,
            body,
        }
    }

    pub fn get(raw_url: impl Into<String>) -> Self {
        Self::new("GET", raw_url, HeaderMap::new(), Vec::new())
    }

    pub fn path(&self) -> &str {
        match self.raw_url.split_once('?') {
            Some((path, _)) => path,
            None => &self.raw_url,
        }
    }

    pub fn query(&self) -> Option<&str> {
        self.raw_url.split_once('?').map(|(_, query)| query)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim().to_string())
    }

    /// Decoded query string pairs, in order of appearance.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Decoded form fields; empty unless the body is urlencoded.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let is_form = self
            .header(http::header::CONTENT_TYPE.as_str())
            .map(|value| value.starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);
        if !is_form || self.body.is_empty() {
            return Vec::new();
        }
        url::form_urlencoded::parse(&self.body).into_owned().collect()
    }

    pub fn form_field(&self, name: &str) -> Option<String> {
        self.form_pairs()
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }
}

/// Structured arguments derived from the raw URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestArgs {
    pub type_name: String,
    pub method_name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl RequestArgs {
    pub fn new(type_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method_name: method_name.into(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

impl fmt::Display for RequestArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_name, self.method_name)
    }
}

/// Uniform result envelope returned on every exit path.
///
/// Handler payload fields are flattened next to the envelope fields, so a
/// payload must not reuse the `error`, `errorMessage` or `postScriptFunc` keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_script_func: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Response {
    pub fn ok() -> Self {
        Self::default()
    }

    /// Error envelope carrying an already localized message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            error_message: Some(message.into()),
            post_script_func: Some(String::new()),
            payload: Map::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    pub fn with_post_script(mut self, script: impl Into<String>) -> Self {
        self.post_script_func = Some(script.into());
        self
    }
}

/// Identity of the current caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub is_administrator: bool,
}

impl Caller {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            roles: Vec::new(),
            is_administrator: false,
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_USER)
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn administrator(mut self) -> Self {
        self.is_administrator = true;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.eq_ignore_ascii_case(ANONYMOUS_USER)
    }

    /// Role names compare case-insensitively.
    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles
            .iter()
            .any(|held| held.trim().eq_ignore_ascii_case(role.trim()))
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Content item referenced by a permission requirement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemRef {
    pub path: String,
    pub id: String,
}

impl ItemRef {
    pub fn new(path: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRight {
    Read,
    Write,
    Rename,
    Create,
    Delete,
    Admin,
}

impl AccessRight {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRight::Read => "item:read",
            AccessRight::Write => "item:write",
            AccessRight::Rename => "item:rename",
            AccessRight::Create => "item:create",
            AccessRight::Delete => "item:delete",
            AccessRight::Admin => "item:admin",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("item:").unwrap_or(&normalized);
        match name {
            "read" => Ok(AccessRight::Read),
            "write" => Ok(AccessRight::Write),
            "rename" => Ok(AccessRight::Rename),
            "create" => Ok(AccessRight::Create),
            "delete" => Ok(AccessRight::Delete),
            "admin" => Ok(AccessRight::Admin),
            _ => Err(CoreError::UnknownAccessRight(raw.to_string())),
        }
    }
}

impl fmt::Display for AccessRight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn response_round_trips_through_json() {
        let response = Response::ok()
            .with_value("itemId", serde_json::json!("{110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9}"))
            .with_value("saved", serde_json::json!(true))
            .with_post_script("window.top.location.reload()");
        let text = serde_json::to_string(&response).unwrap();
        let back: Response = serde_json::from_str(&text).unwrap();
        assert_eq!(back, response);
    }

    #[test]
    fn failure_envelope_serializes_expected_fields() {
        let text = serde_json::to_string(&Response::failure("An error occurred.")).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["error"], serde_json::json!(true));
        assert_eq!(value["errorMessage"], serde_json::json!("An error occurred."));
        assert_eq!(value["postScriptFunc"], serde_json::json!(""));
    }

    #[test]
    fn success_envelope_omits_absent_message() {
        let text = serde_json::to_string(&Response::ok()).unwrap();
        assert_eq!(text, r#"{"error":false}"#);
    }

    #[test]
    fn request_splits_path_and_query() {
        let request = InboundRequest::get("/sitecore/shell/Save.ashx?handler=PageEditor&method=Save");
        assert_eq!(request.path(), "/sitecore/shell/Save.ashx");
        assert_eq!(request.query(), Some("handler=PageEditor&method=Save"));
        assert_eq!(request.query_pairs().len(), 2);
    }

    #[test]
    fn cookie_lookup_reads_all_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(http::header::COOKIE, HeaderValue::from_static("a=1; b=2"));
        headers.append(http::header::COOKIE, HeaderValue::from_static("sitecore_userticket=t-1"));
        let request = InboundRequest::new("GET", "/", headers, Vec::new());
        assert_eq!(request.cookie("b").as_deref(), Some("2"));
        assert_eq!(request.cookie("sitecore_userticket").as_deref(), Some("t-1"));
        assert!(request.cookie("missing").is_none());
    }

    #[test]
    fn form_fields_require_urlencoded_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        let request = InboundRequest::new("POST", "/", headers, b"token=abc&x=a+b".to_vec());
        assert_eq!(request.form_field("token").as_deref(), Some("abc"));
        assert_eq!(request.form_field("x").as_deref(), Some("a b"));

        let plain = InboundRequest::new("POST", "/", HeaderMap::new(), b"token=abc".to_vec());
        assert!(plain.form_pairs().is_empty());
    }

    #[test]
    fn caller_roles_compare_case_insensitively() {
        let caller = Caller::new("sitecore\\author").with_roles(["sitecore\\Author"]);
        assert!(caller.is_in_role("SITECORE\\author"));
        assert!(!caller.is_in_role("sitecore\\Developer"));
        assert!(Caller::anonymous().is_anonymous());
    }

    #[test]
    fn access_rights_parse_with_or_without_prefix() {
        assert_eq!(AccessRight::parse("item:write").unwrap(), AccessRight::Write);
        assert_eq!(AccessRight::parse("Read").unwrap(), AccessRight::Read);
        assert!(AccessRight::parse("fly").is_err());
    }
}
