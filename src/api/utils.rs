//! API utility functions
//!
//! Pure, stateless helpers for request processing, kept apart from the
//! handlers so they can be unit tested.

use axum::http::{HeaderMap, header};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// Parses and validates Content-Type header for application/json
///
/// Accepts:
/// - `application/json`
/// - `application/json; charset=utf-8`
///
/// Rejects:
/// - `application/jsonp`
/// - `application/json-patch+json`
/// - `text/json`
/// - Malformed media types
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidRequest(format!("invalid Content-Type: {}", content_type))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidRequest(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Validates that an encoded value does not exceed `max_size` bytes
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(max_size));
    }
    Ok(())
}

/// Constant-time comparison of the presented token with the configured one.
/// An empty configured secret never matches.
pub fn token_matches(presented: &[u8], expected: &[u8]) -> bool {
    if expected.is_empty() || presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Check the Content-Type, read the body up to `max_size` bytes and decode it
///
/// Decompression already happened in `RequestDecompressionLayer`, so the
/// limit applies to the decoded body. Reading stops at the first frame past
/// the limit.
pub async fn read_json<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: axum::body::Body,
    max_size: usize,
) -> Result<T, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidRequest("missing Content-Type header".into()))?;
    parse_content_type(content_type)?;

    let data = Limited::new(body, max_size)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge(max_size)
            } else {
                ApiError::InvalidRequest(format!("failed to read body: {err}"))
            }
        })?
        .to_bytes();

    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_type_valid() {
        assert!(parse_content_type("application/json").is_ok());
        assert!(parse_content_type("application/json; charset=utf-8").is_ok());
        assert!(parse_content_type("application/json; charset=UTF-8").is_ok());
    }

    #[test]
    fn test_parse_content_type_invalid() {
        assert!(parse_content_type("application/jsonp").is_err());
        assert!(parse_content_type("application/json-patch+json").is_err());
        assert!(parse_content_type("text/json").is_err());
        assert!(parse_content_type("invalid").is_err());
        assert!(parse_content_type("").is_err());
    }

    #[test]
    fn test_validate_body_size_too_large() {
        let data = vec![0u8; 1000];
        assert!(validate_body_size(&data, 1000).is_ok());
        match validate_body_size(&data, 999) {
            Err(ApiError::PayloadTooLarge(limit)) => assert_eq!(limit, 999),
            _ => panic!("Expected PayloadTooLarge error"),
        }
    }

    #[test]
    fn test_token_matches() {
        assert!(token_matches(b"mesh-secret", b"mesh-secret"));
        assert!(!token_matches(b"mesh-secreT", b"mesh-secret"));
        assert!(!token_matches(b"mesh", b"mesh-secret"));
        assert!(!token_matches(b"", b""));
    }

    #[tokio::test]
    async fn test_read_json_requires_json_content_type() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());

        let result: Result<serde_json::Value, _> =
            read_json(&headers, axum::body::Body::from("{}"), 1024).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_read_json_decodes_body() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        let value: serde_json::Value =
            read_json(&headers, axum::body::Body::from(r#"{"ok":true}"#), 1024)
                .await
                .unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_read_json_stops_reading_past_limit() {
        use futures::StreamExt;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let chunks = futures::stream::iter(0..64).map(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::io::Error>(vec![b' '; 1024 * 1024])
        });

        let result: Result<serde_json::Value, _> =
            read_json(&headers, axum::body::Body::from_stream(chunks), 1024).await;

        match result {
            Err(ApiError::PayloadTooLarge(limit)) => assert_eq!(limit, 1024),
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
        assert!(polled.load(Ordering::SeqCst) < 64);
    }

    #[tokio::test]
    async fn test_read_json_accepts_body_at_limit() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        let body = r#"{"ok":true}"#;
        let value: serde_json::Value =
            read_json(&headers, axum::body::Body::from(body), body.len())
                .await
                .unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }
}
