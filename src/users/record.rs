// User record and transport-neutral request/response descriptors

use hyper::{Method, StatusCode};
use serde::Serialize;
use std::collections::HashMap;

/// A stored user: `UserId`, `Height`, `Weight` plus any caller fields,
/// kept in insertion order.
pub type UserRecord = serde_json::Map<String, serde_json::Value>;

/// Normalized request handed to the router
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub query: Option<HashMap<String, String>>,
    pub body: Option<String>,
}

impl RequestDescriptor {
    /// Look up a query parameter, `None` when the request has no query at all
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.as_ref()?.get(name).map(String::as_str)
    }
}

#[cfg(test)]
impl RequestDescriptor {
    pub const fn new(method: Method) -> Self {
        Self {
            method,
            query: None,
            body: None,
        }
    }

    #[must_use]
    pub fn with_query_param(mut self, name: &str, value: &str) -> Self {
        self.query
            .get_or_insert_with(HashMap::new)
            .insert(name.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Normalized response produced by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub status: StatusCode,
    pub body: String,
}

impl ResponseDescriptor {
    /// Serialize `body` as compact JSON
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        let body = serde_json::to_string(body).unwrap_or_else(|e| {
            crate::logger::log_error(&format!("Failed to serialize response: {e}"));
            r#"{"message":"Internal server error"}"#.to_string()
        });
        Self { status, body }
    }

    /// `{"message": "..."}` body used by every error outcome
    pub fn message(status: StatusCode, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_absent_without_query() {
        let req = RequestDescriptor::new(Method::GET);
        assert!(req.query.is_none());
        assert_eq!(req.query_param("username"), None);
    }

    #[test]
    fn test_query_param_lookup() {
        let req = RequestDescriptor::new(Method::GET)
            .with_query_param("username", "u1")
            .with_query_param("other", "x");
        assert_eq!(req.query_param("username"), Some("u1"));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_message_body() {
        let resp = ResponseDescriptor::message(StatusCode::NOT_FOUND, "User not found");
        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body, r#"{"message":"User not found"}"#);
    }

    #[test]
    fn test_json_body_keeps_field_order() {
        let mut record = UserRecord::new();
        record.insert("UserId".into(), "u1".into());
        record.insert("Weight".into(), 75.into());
        record.insert("Height".into(), 180.into());
        let resp = ResponseDescriptor::json(StatusCode::CREATED, &record);
        assert_eq!(resp.body, r#"{"UserId":"u1","Weight":75,"Height":180}"#);
    }
}
