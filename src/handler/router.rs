//! Request routing dispatch module
//!
//! Health probes are answered directly; every other path is converted to a
//! request descriptor and handed to the user router. A fault escaping the
//! router becomes a generic 500 here, the way a function host reports an
//! unhandled error.

use crate::config::AppState;
use crate::http::{self, RequestError};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, REFERER, USER_AGENT};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let access_entry = state
        .access_log_enabled()
        .then(|| access_entry(&req, peer_addr));

    let response = dispatch(req, &state).await;

    if let Some(mut entry) = access_entry {
        let body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let server_name = state.config.http.server_name.as_str();

    if is_health_probe(&req, state) {
        return http::build_health_response(server_name);
    }

    let descriptor = match http::into_descriptor(req, state.config.http.max_body_size).await {
        Ok(descriptor) => descriptor,
        Err(e @ RequestError::TooLarge(_)) => {
            logger::log_warning(&e.to_string());
            return http::build_413_response(server_name);
        }
        Err(e @ RequestError::Read(_)) => {
            logger::log_warning(&e.to_string());
            return http::build_bad_request_response(&e.to_string(), server_name);
        }
    };

    match state.users.route(&descriptor).await {
        Ok(outcome) => http::build_descriptor_response(outcome, server_name),
        Err(fault) => {
            logger::log_error(&format!(
                "[Users] Unhandled fault in {} request on table {}: {fault}",
                descriptor.method,
                state.users.table()
            ));
            http::build_fault_response(server_name)
        }
    }
}

fn is_health_probe<B>(req: &Request<B>, state: &AppState) -> bool {
    let health = &state.config.routes.health;
    let path = req.uri().path();
    health.enabled
        && *req.method() == Method::GET
        && (path == health.liveness_path || path == health.readiness_path)
}

fn access_entry<B>(req: &Request<B>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = match req.version() {
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        _ => "1.1",
    }
    .to_string();
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use http_body_util::BodyExt;
    use hyper::StatusCode;

    fn state_with(configure: impl FnOnce(&mut Config)) -> Arc<AppState> {
        let mut config = Config::load_from("does-not-exist/config").unwrap();
        config.logging.access_log = false;
        configure(&mut config);
        let store = Arc::new(MemoryStore::new("UserId", &["Users"]));
        Arc::new(AppState::new(&config, store))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:50000".parse().unwrap()
    }

    fn request(method: Method, uri: &str, body: &str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> (StatusCode, String) {
        let resp = handle_request(req, Arc::clone(state), peer()).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_post_then_get_over_http() {
        let state = state_with(|_| {});
        let (status, body) = send(
            &state,
            request(Method::POST, "/", r#"{"UserId":"u1","Height":180,"Weight":75}"#),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, r#"{"UserId":"u1","Height":180,"Weight":75}"#);

        let (status, body) = send(&state, request(Method::GET, "/?username=u1", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"Height":180,"Weight":75,"BMI":"23.15"}"#);
    }

    #[tokio::test]
    async fn test_url_encoded_username() {
        let state = state_with(|_| {});
        send(
            &state,
            request(Method::POST, "/users", r#"{"UserId":"jo doe","Height":160,"Weight":64}"#),
        )
        .await;
        let (status, body) = send(&state, request(Method::GET, "/users?username=jo%20doe", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"Height":160,"Weight":64,"BMI":"25.00"}"#);
    }

    #[tokio::test]
    async fn test_missing_username() {
        let state = state_with(|_| {});
        let (status, body) = send(&state, request(Method::GET, "/", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"message":"Missing username in query parameters"}"#);
    }

    #[tokio::test]
    async fn test_delete_not_allowed() {
        let state = state_with(|_| {});
        let (status, body) = send(&state, request(Method::DELETE, "/?username=u1", "")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body, r#"{"message":"Unsupported method DELETE"}"#);
    }

    #[tokio::test]
    async fn test_malformed_body_is_generic_500() {
        let state = state_with(|_| {});
        let (status, body) = send(&state, request(Method::POST, "/", "{oops")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"message":"Internal server error"}"#);
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let state = state_with(|c| c.http.max_body_size = 8);
        let (status, _) = send(
            &state,
            request(Method::POST, "/", r#"{"UserId":"u1","Height":180}"#),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_health_probes() {
        let state = state_with(|_| {});
        let (status, body) = send(&state, request(Method::GET, "/healthz", "")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
        let (status, _) = send(&state, request(Method::GET, "/readyz", "")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_disabled_routes_to_users() {
        let state = state_with(|c| c.routes.health.enabled = false);
        let (status, _) = send(&state, request(Method::GET, "/healthz", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_access_entry_fields() {
        let req = Request::builder()
            .method(Method::GET)
            .uri("/?username=u1")
            .header(USER_AGENT, "curl/8.5")
            .body(())
            .unwrap();
        let entry = access_entry(&req, peer());
        assert_eq!(entry.remote_addr, "127.0.0.1");
        assert_eq!(entry.path, "/");
        assert_eq!(entry.query.as_deref(), Some("username=u1"));
        assert_eq!(entry.user_agent.as_deref(), Some("curl/8.5"));
        assert!(entry.referer.is_none());
    }
}
