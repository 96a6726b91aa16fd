//! HTTP response building module
//!
//! Every response body is JSON; builders fall back to a bare response if the
//! builder itself fails.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};

use crate::users::ResponseDescriptor;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Build the hyper response for a router outcome
pub fn build_descriptor_response(
    descriptor: ResponseDescriptor,
    server_name: &str,
) -> Response<Full<Bytes>> {
    build_json_response(descriptor.status, descriptor.body, server_name)
}

/// Build 200 health probe response
pub fn build_health_response(server_name: &str) -> Response<Full<Bytes>> {
    build_json_response(
        StatusCode::OK,
        r#"{"status":"ok"}"#.to_string(),
        server_name,
    )
}

/// Build 413 Payload Too Large response
pub fn build_413_response(server_name: &str) -> Response<Full<Bytes>> {
    build_json_response(
        StatusCode::PAYLOAD_TOO_LARGE,
        r#"{"message":"Request body too large"}"#.to_string(),
        server_name,
    )
}

/// Build 400 response for a request that could not be read
pub fn build_bad_request_response(message: &str, server_name: &str) -> Response<Full<Bytes>> {
    let descriptor = ResponseDescriptor::message(StatusCode::BAD_REQUEST, message);
    build_descriptor_response(descriptor, server_name)
}

/// Build the generic 500 returned when request handling faults
pub fn build_fault_response(server_name: &str) -> Response<Full<Bytes>> {
    build_json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"message":"Internal server error"}"#.to_string(),
        server_name,
    )
}

fn build_json_response(status: StatusCode, body: String, server_name: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
        .header(SERVER, server_name)
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|e| {
            log_build_error(status, &e);
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = status;
            fallback
        })
}

/// Log response build error
fn log_build_error(status: StatusCode, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_descriptor_response() {
        let descriptor = ResponseDescriptor::message(StatusCode::NOT_FOUND, "User not found");
        let resp = build_descriptor_response(descriptor, "bmi-service/0.1");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(resp.headers()[SERVER], "bmi-service/0.1");
        assert_eq!(body_text(resp).await, r#"{"message":"User not found"}"#);
    }

    #[tokio::test]
    async fn test_fault_response() {
        let resp = build_fault_response("s");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(resp).await, r#"{"message":"Internal server error"}"#);
    }

    #[test]
    fn test_invalid_server_name_falls_back() {
        let resp = build_health_response("bad\nname");
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
