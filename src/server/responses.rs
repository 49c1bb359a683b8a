// Wire response envelopes for both capability dialects

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::capabilities::Dialect;
use crate::core::errors::BridgeError;
use crate::dispatch::client::ForwardedResponse;

/// Success envelope for a locally executed command.
///
/// W3C sessions get `{"value": ...}`; legacy sessions get the numeric
/// status triple the old protocol expects.
pub fn success_response(dialect: Dialect, session_id: Option<&str>, value: Value) -> Response {
    let body = match dialect {
        Dialect::W3c => json!({ "value": value }),
        Dialect::Legacy => json!({
            "status": 0,
            "sessionId": session_id,
            "value": value,
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// New-session envelope. Both dialects return the session id and the
/// negotiated capabilities, shaped per dialect.
pub fn session_created_response(
    dialect: Dialect,
    session_id: &str,
    capabilities: &serde_json::Map<String, Value>,
) -> Response {
    let body = match dialect {
        Dialect::W3c => json!({
            "value": {
                "sessionId": session_id,
                "capabilities": capabilities,
            }
        }),
        Dialect::Legacy => json!({
            "status": 0,
            "sessionId": session_id,
            "value": capabilities,
        }),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Error envelope. The HTTP status, W3C error code string, and legacy
/// numeric status all come from the error itself.
pub fn error_response(dialect: Dialect, session_id: Option<&str>, err: &BridgeError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = match dialect {
        Dialect::W3c => json!({
            "value": {
                "error": err.error_code(),
                "message": err.to_string(),
                "stacktrace": "",
            }
        }),
        Dialect::Legacy => json!({
            "status": err.legacy_status(),
            "sessionId": session_id,
            "value": { "message": err.to_string() },
        }),
    };
    (status, Json(body)).into_response()
}

/// Pass an upstream proxy response through unchanged: same status, same
/// bytes. The bridge never re-envelopes what the downstream said.
pub fn forwarded_response(upstream: ForwardedResponse) -> Response {
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    (
        status,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        upstream.body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_w3c_success_envelope() {
        let response = success_response(Dialect::W3c, Some("abc"), json!("https://example.com"));
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({"value": "https://example.com"}));
    }

    #[tokio::test]
    async fn test_legacy_success_envelope_carries_status_and_session() {
        let response = success_response(Dialect::Legacy, Some("abc"), Value::Null);
        let body = body_json(response).await;
        assert_eq!(body["status"], 0);
        assert_eq!(body["sessionId"], "abc");
        assert_eq!(body["value"], Value::Null);
    }

    #[tokio::test]
    async fn test_w3c_error_envelope() {
        let err = BridgeError::InvalidSessionId("nope".to_string());
        let response = error_response(Dialect::W3c, None, &err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["value"]["error"], "invalid session id");
        assert!(body["value"]["message"]
            .as_str()
            .unwrap()
            .contains("nope"));
    }

    #[tokio::test]
    async fn test_legacy_error_envelope_uses_numeric_status() {
        let err = BridgeError::UnknownCommand("warp".to_string());
        let response = error_response(Dialect::Legacy, Some("abc"), &err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["status"], 9);
        assert_eq!(body["sessionId"], "abc");
    }

    #[tokio::test]
    async fn test_forwarded_response_is_verbatim() {
        let upstream = ForwardedResponse {
            status: 418,
            body: br#"{"value":"teapot"}"#.to_vec(),
        };
        let response = forwarded_response(upstream);
        assert_eq!(response.status().as_u16(), 418);
        let body = body_json(response).await;
        assert_eq!(body["value"], "teapot");
    }
}
