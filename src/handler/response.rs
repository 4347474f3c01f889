use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;

pub const ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
pub const ALLOWED_HEADERS: &str = "Content-Type,Authorization";

/// Uniform response envelope: status, headers and a JSON-serialized body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

fn cors_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Methods".to_string(),
            ALLOWED_METHODS.to_string(),
        ),
        (
            "Access-Control-Allow-Headers".to_string(),
            ALLOWED_HEADERS.to_string(),
        ),
    ])
}

impl ProxyResponse {
    /// A response with no payload and therefore no content type.
    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            headers: cors_headers(),
            body: String::new(),
        }
    }

    pub fn json<T: Serialize + ?Sized>(status_code: u16, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self::raw_json(status_code, body),
            Err(e) => {
                tracing::error!("Failed to serialize response body: {e}");
                Self::raw_json(500, r#"{"message":"Internal server error"}"#.to_string())
            }
        }
    }

    fn raw_json(status_code: u16, body: String) -> Self {
        let mut headers = cors_headers();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code,
            headers,
            body,
        }
    }

    /// `{"message": ...}`
    pub fn message(status_code: u16, message: &str) -> Self {
        Self::json(status_code, &json!({ "message": message }))
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
