//! Request conversion module
//!
//! Turns a hyper request into a [`RequestDescriptor`]: method, decoded query
//! parameters and body text, with the body size capped.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{HeaderMap, Request};
use std::collections::HashMap;
use thiserror::Error;

use crate::users::RequestDescriptor;

/// Failures while reading a request off the wire
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request body too large (max: {0} bytes)")]
    TooLarge(u64),

    #[error("Failed to read request body: {0}")]
    Read(String),
}

/// Build a descriptor from `req`, reading at most `max_body_size` bytes
///
/// A URI without `?` has no query map; an empty body has no body text.
pub async fn into_descriptor<B>(
    req: Request<B>,
    max_body_size: u64,
) -> Result<RequestDescriptor, RequestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();

    if declared_length(&parts.headers).is_some_and(|len| len > max_body_size) {
        return Err(RequestError::TooLarge(max_body_size));
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    let bytes = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                RequestError::TooLarge(max_body_size)
            } else {
                RequestError::Read(e.to_string())
            }
        })?
        .to_bytes();

    Ok(RequestDescriptor {
        method: parts.method,
        query: parts.uri.query().map(parse_query),
        body: (!bytes.is_empty()).then(|| String::from_utf8_lossy(&bytes).into_owned()),
    })
}

/// Decode `a=1&b=x%20y`; a repeated name keeps its last value
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(CONTENT_LENGTH)?;
    match value.to_str().ok().and_then(|v| v.parse::<u64>().ok()) {
        Some(len) => Some(len),
        None => {
            crate::logger::log_warning("Invalid Content-Length value, skipping size check");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::Method;

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    #[test]
    fn test_parse_query_decodes() {
        let q = parse_query("username=john%20doe&x=1&username=jane+roe");
        assert_eq!(q.get("username").map(String::as_str), Some("jane roe"));
        assert_eq!(q.get("x").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_get_descriptor() {
        let desc = into_descriptor(request(Method::GET, "/users?username=u1", ""), 1024)
            .await
            .unwrap();
        assert_eq!(desc.method, Method::GET);
        assert_eq!(desc.query_param("username"), Some("u1"));
        assert!(desc.body.is_none());
    }

    #[tokio::test]
    async fn test_no_query_string() {
        let desc = into_descriptor(request(Method::GET, "/", ""), 1024)
            .await
            .unwrap();
        assert!(desc.query.is_none());
    }

    #[tokio::test]
    async fn test_post_body_text() {
        let body = r#"{"UserId":"u1","Height":180,"Weight":75}"#;
        let desc = into_descriptor(request(Method::POST, "/", body), 1024)
            .await
            .unwrap();
        assert_eq!(desc.body.as_deref(), Some(body));
    }

    #[tokio::test]
    async fn test_body_over_limit() {
        let result = into_descriptor(request(Method::POST, "/", "0123456789"), 4).await;
        assert!(matches!(result, Err(RequestError::TooLarge(4))));
    }

    #[tokio::test]
    async fn test_declared_length_over_limit() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(CONTENT_LENGTH, "4096")
            .body(Full::new(Bytes::from_static(b"{}")))
            .unwrap();
        let result = into_descriptor(req, 1024).await;
        assert!(matches!(result, Err(RequestError::TooLarge(1024))));
    }
}
