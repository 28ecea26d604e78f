//! HTTP response building helpers
//!
//! Provides a consistent API for building HTTP responses across all handlers.
//! Reduces boilerplate and ensures consistent error formatting.

use crate::error::CatalogError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::HeaderValue;
use hyper::{header, Response, StatusCode};
use serde::Serialize;

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Build a JSON response with 200 OK status
pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

/// Build a JSON response with 201 Created status
pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

/// Build an empty response with 204 No Content status
pub fn no_content() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({ "error": message }),
    )
}

/// Build a 400 Bad Request response with message
pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        &serde_json::json!({ "error": message }),
    )
}

/// Build a 500 Internal Server Error response with message
pub fn internal_error(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({ "error": message }),
    )
}

/// Map a catalog error to its HTTP representation.
///
/// Expected outcomes (validation, not-found) keep their specific message;
/// storage failures surface as 500s. A consistency violation is served as a
/// degraded not-found - the loud logging happened where it was detected.
pub fn error_response(err: &CatalogError) -> Response<Full<Bytes>> {
    match err {
        CatalogError::Validation(_) | CatalogError::Multipart(_) | CatalogError::InvalidName(_) => {
            bad_request(&err.to_string())
        }
        CatalogError::EntryNotFound(_)
        | CatalogError::BlobNotFound(_)
        | CatalogError::NoImage(_)
        | CatalogError::MissingBlob { .. } => not_found(&err.to_string()),
        CatalogError::PayloadTooLarge { .. } => json_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            &serde_json::json!({ "error": err.to_string() }),
        ),
        _ => internal_error(&err.to_string()),
    }
}

/// Add CORS headers so browser frontends can call the API directly.
pub fn with_cors(mut response: Response<Full<Bytes>>) -> Response<Full<Bytes>> {
    let headers = response.headers_mut();
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    response
}

/// CORS preflight response
pub fn cors_preflight() -> Response<Full<Bytes>> {
    with_cors(
        Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Access-Control-Max-Age", "86400")
            .body(Full::new(Bytes::new()))
            .unwrap(),
    )
}
