use serde::Deserialize;
use std::collections::HashMap;

/// Name of the greedy path capture used by proxy-style routes, e.g. `/{proxy+}`.
pub const PROXY_PARAM: &str = "proxy";
/// Name of the path capture used by `/crud/{id}` style routes.
pub const ID_PARAM: &str = "id";

/// One incoming request, in the shape an API gateway proxy integration hands
/// to a function.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    pub http_method: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body: Option<String>,
}

type IdStrategy = fn(&HashMap<String, String>) -> Option<String>;

/// Tried in order; the first strategy that yields a non-empty id wins. Both
/// stay because the gateway in front of the handler may be configured either
/// way.
const ID_STRATEGIES: [IdStrategy; 2] = [proxy_segment, named_id];

/// `crud/123` -> `123`
fn proxy_segment(params: &HashMap<String, String>) -> Option<String> {
    params
        .get(PROXY_PARAM)?
        .split('/')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
}

fn named_id(params: &HashMap<String, String>) -> Option<String> {
    params.get(ID_PARAM).filter(|id| !id.is_empty()).cloned()
}

impl ProxyRequest {
    pub fn new(http_method: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            ..Self::default()
        }
    }

    pub fn with_path_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_parameters
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The item identifier addressed by the request path, if any.
    pub fn item_id(&self) -> Option<String> {
        let params = self.path_parameters.as_ref()?;
        ID_STRATEGIES.iter().find_map(|strategy| strategy(params))
    }

    /// The request body, treating an empty string the same as no body.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref().filter(|body| !body.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_second_segment_of_proxy_capture() {
        let request = ProxyRequest::new("GET").with_path_parameter("proxy", "crud/123");
        assert_eq!(request.item_id().as_deref(), Some("123"));
    }

    #[test]
    fn proxy_without_segment_falls_back_to_named_id() {
        let request = ProxyRequest::new("GET")
            .with_path_parameter("proxy", "crud")
            .with_path_parameter("id", "abc");
        assert_eq!(request.item_id().as_deref(), Some("abc"));
    }

    #[test]
    fn proxy_segment_wins_over_named_id() {
        let request = ProxyRequest::new("GET")
            .with_path_parameter("proxy", "crud/from-proxy")
            .with_path_parameter("id", "from-name");
        assert_eq!(request.item_id().as_deref(), Some("from-proxy"));
    }

    #[test]
    fn no_parameters_means_no_id() {
        assert_eq!(ProxyRequest::new("GET").item_id(), None);
        let request = ProxyRequest::new("GET")
            .with_path_parameter("proxy", "crud/")
            .with_path_parameter("id", "");
        assert_eq!(request.item_id(), None);
    }

    #[test]
    fn empty_body_counts_as_missing() {
        assert_eq!(ProxyRequest::new("POST").with_body("").body(), None);
        assert_eq!(ProxyRequest::new("POST").with_body("{}").body(), Some("{}"));
    }

    #[test]
    fn deserializes_gateway_event() {
        let event = r#"{
            "httpMethod": "PUT",
            "path": "/crud/42",
            "pathParameters": {"proxy": "crud/42"},
            "headers": null,
            "body": "{\"name\":\"Alice\"}",
            "requestContext": {"stage": "prod"}
        }"#;
        let request: ProxyRequest = serde_json::from_str(event).unwrap();
        assert_eq!(request.http_method, "PUT");
        assert_eq!(request.item_id().as_deref(), Some("42"));
        assert_eq!(request.body(), Some(r#"{"name":"Alice"}"#));
    }
}
