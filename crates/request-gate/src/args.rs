use speak_core_types::{InboundRequest, RequestArgs};

use crate::ports::RequestArgsResolver;
use crate::registry::DEFAULT_METHOD;

pub const DEFAULT_ROUTE_PREFIX: &str = "/-/speak/request/v1/expeditor";

const HANDLER_PARAM: &str = "handler";
const METHOD_PARAM: &str = "method";

/// Resolves arguments from the query string, falling back to the path.
///
/// `?handler=<Type>&method=<Method>` names the target explicitly. Otherwise a
/// URL of the form `<route prefix>/<Type>` targets [`DEFAULT_METHOD`]. Every
/// other query or form field becomes a parameter.
#[derive(Clone, Debug)]
pub struct QueryArgsResolver {
    route_prefix: String,
}

impl QueryArgsResolver {
    pub fn new(route_prefix: impl Into<String>) -> Self {
        Self {
            route_prefix: route_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn route_prefix(&self) -> &str {
        &self.route_prefix
    }

    fn type_from_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(&self.route_prefix)?.strip_prefix('/')?;
        let name = rest.trim_end_matches('/');
        (!name.is_empty() && !name.contains('/')).then_some(name)
    }
}

impl Default for QueryArgsResolver {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_PREFIX)
    }
}

impl RequestArgsResolver for QueryArgsResolver {
    fn create(&self, request: &InboundRequest) -> Option<RequestArgs> {
        let mut type_name = None;
        let mut method_name = None;
        let mut parameters = Vec::new();

        for (key, value) in request.query_pairs().into_iter().chain(request.form_pairs()) {
            if key == HANDLER_PARAM && type_name.is_none() {
                type_name = Some(value);
            } else if key == METHOD_PARAM && method_name.is_none() {
                method_name = Some(value);
            } else {
                parameters.push((key, value));
            }
        }

        let type_name = type_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.type_from_path(request.path()).map(str::to_string))?;
        let method_name = method_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_METHOD.to_string());

        let mut args = RequestArgs::new(type_name, method_name);
        for (key, value) in parameters {
            args.parameters.entry(key).or_insert(value);
        }
        Some(args)
    }
}

#[cfg(test)]
mod tests {
    use http::{header, HeaderMap, HeaderValue};

    use super::*;

    #[test]
    fn query_names_handler_and_method() {
        let resolver = QueryArgsResolver::default();
        let request = InboundRequest::get("/any/path?handler=PageEditor&method=Save&itemId=42");
        let args = resolver.create(&request).unwrap();
        assert_eq!(args.type_name, "PageEditor");
        assert_eq!(args.method_name, "Save");
        assert_eq!(args.param("itemId"), Some("42"));
    }

    #[test]
    fn path_names_type_with_default_method() {
        let resolver = QueryArgsResolver::default();
        let request = InboundRequest::get("/-/speak/request/v1/expeditor/Gateway.Ping?x=1");
        let args = resolver.create(&request).unwrap();
        assert_eq!(args.type_name, "Gateway.Ping");
        assert_eq!(args.method_name, DEFAULT_METHOD);
        assert_eq!(args.param("x"), Some("1"));
    }

    #[test]
    fn unrelated_url_resolves_nothing() {
        let resolver = QueryArgsResolver::default();
        assert!(resolver.create(&InboundRequest::get("/sitecore/shell/default.aspx")).is_none());
        assert!(resolver
            .create(&InboundRequest::get("/-/speak/request/v1/expeditor/"))
            .is_none());
        assert!(resolver.create(&InboundRequest::get("/x?handler=")).is_none());
    }

    #[test]
    fn form_fields_become_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let request = InboundRequest::new(
            "POST",
            "/x?handler=PageEditor&method=Save",
            headers,
            b"title=Hello+World&itemId=7".to_vec(),
        );
        let args = QueryArgsResolver::default().create(&request).unwrap();
        assert_eq!(args.param("title"), Some("Hello World"));
        assert_eq!(args.param("itemId"), Some("7"));
    }
}
