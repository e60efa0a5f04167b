//! Response classification: raw status + body to a typed outcome.
//!
//! # Design
//! The table is evaluated top to bottom; the first matching row wins.
//!
//! | condition                          | outcome                                   |
//! |------------------------------------|-------------------------------------------|
//! | 204                                | `Empty`                                   |
//! | 401                                | `Authorization`, "token invalid/expired"  |
//! | 403                                | `Authorization`, "access forbidden"       |
//! | 400                                | `Validation`, detail taken from the body  |
//! | 2xx, blank body                    | `Transport`, "empty response body"        |
//! | 2xx, body is `null`                | `Transport`, "null response body"         |
//! | 2xx, body does not deserialize     | `Transport`, "response parse error"       |
//! | 2xx, body deserializes             | `Ok(T)`                                   |
//! | anything else                      | `Transport`, "<status>: <body>"           |

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ErrorKind};
use crate::http::HttpResponse;

/// Upper bound on how much of a response body is copied into error messages
/// and log events.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

pub const MSG_UNAUTHORIZED: &str = "token invalid/expired";
pub const MSG_FORBIDDEN: &str = "access forbidden";
pub const MSG_EMPTY_BODY: &str = "empty response body";
pub const MSG_NULL_BODY: &str = "null response body";
pub const MSG_PARSE_ERROR: &str = "response parse error";

/// Outcome of classifying one response. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified<T> {
    Ok(T),
    /// Success without content (204).
    Empty,
    Failed { kind: ErrorKind, message: String },
}

impl<T> Classified<T> {
    fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Classified::Failed {
            kind,
            message: message.into(),
        }
    }

    /// `Ok(Some(value))`, `Ok(None)` for `Empty`, `Err` for `Failed`.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self {
            Classified::Ok(value) => Ok(Some(value)),
            Classified::Empty => Ok(None),
            Classified::Failed { kind, message } => Err(ApiError::from_kind(kind, message)),
        }
    }
}

/// Classify `response` as a `T` payload.
pub fn classify<T: DeserializeOwned>(response: &HttpResponse) -> Classified<T> {
    let outcome = classify_inner(response);
    if let Classified::Failed { kind, message } = &outcome {
        tracing::warn!(
            status = response.status,
            kind = ?kind,
            request = response.request_echo.as_deref().unwrap_or("-"),
            body = %body_preview(&response.body),
            "{message}"
        );
    }
    outcome
}

fn classify_inner<T: DeserializeOwned>(response: &HttpResponse) -> Classified<T> {
    match response.status {
        204 => Classified::Empty,
        401 => Classified::failed(ErrorKind::Authorization, MSG_UNAUTHORIZED),
        403 => Classified::failed(ErrorKind::Authorization, MSG_FORBIDDEN),
        400 => Classified::failed(ErrorKind::Validation, validation_detail(&response.body)),
        200..=299 => decode_body(&response.body),
        status => Classified::failed(
            ErrorKind::Transport,
            format!("{status}: {}", body_preview(&response.body)),
        ),
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Classified<T> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Classified::failed(ErrorKind::Transport, MSG_EMPTY_BODY);
    }
    if trimmed == "null" {
        return Classified::failed(ErrorKind::Transport, MSG_NULL_BODY);
    }
    match serde_json::from_str(trimmed) {
        Ok(value) => Classified::Ok(value),
        Err(e) => {
            tracing::debug!(error = %e, "response body did not match the expected shape");
            Classified::failed(ErrorKind::Transport, MSG_PARSE_ERROR)
        }
    }
}

/// Pull the most useful detail out of a 400 body.
///
/// Problem-style bodies carry `detail` (or at least `title`); field-level
/// `validation-errors` entries are appended as `path: detail`.
fn validation_detail(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) else {
        return if trimmed.is_empty() {
            "bad request".to_string()
        } else {
            body_preview(trimmed)
        };
    };

    let mut detail = map
        .get("detail")
        .and_then(Value::as_str)
        .or_else(|| map.get("title").and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| body_preview(trimmed));

    let field_errors: Vec<String> = map
        .get("validation-errors")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.get("errors").and_then(Value::as_array))
        .flatten()
        .filter_map(|error| {
            let path = error.get("path").and_then(Value::as_str)?;
            let text = error
                .get("detail")
                .and_then(Value::as_str)
                .or_else(|| error.get("code").and_then(Value::as_str))
                .unwrap_or("invalid");
            Some(format!("{path}: {text}"))
        })
        .collect();

    if !field_errors.is_empty() {
        detail.push_str(" (");
        detail.push_str(&field_errors.join("; "));
        detail.push(')');
    }
    detail
}

/// Truncate `body` to [`ERROR_BODY_PREVIEW_LIMIT`] on a char boundary.
pub fn body_preview(body: &str) -> String {
    if body.len() <= ERROR_BODY_PREVIEW_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_PREVIEW_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Item {
        id: u64,
    }

    fn failed<T>(outcome: Classified<T>) -> (ErrorKind, String) {
        match outcome {
            Classified::Failed { kind, message } => (kind, message),
            Classified::Ok(_) => panic!("expected failure, got Ok"),
            Classified::Empty => panic!("expected failure, got Empty"),
        }
    }

    #[test]
    fn no_content_is_empty() {
        assert_eq!(classify::<Item>(&HttpResponse::new(204, "")), Classified::Empty);
    }

    #[test]
    fn unauthorized_with_any_body_is_authorization() {
        let (kind, message) = failed(classify::<Item>(&HttpResponse::new(401, "{\"id\":1}")));
        assert_eq!(kind, ErrorKind::Authorization);
        assert_eq!(message, MSG_UNAUTHORIZED);
    }

    #[test]
    fn forbidden_is_authorization() {
        let (kind, message) = failed(classify::<Item>(&HttpResponse::new(403, "")));
        assert_eq!(kind, ErrorKind::Authorization);
        assert_eq!(message, MSG_FORBIDDEN);
    }

    #[test]
    fn bad_request_carries_detail() {
        let response = HttpResponse::new(400, r#"{"detail":"bad field"}"#);
        let (kind, message) = failed(classify::<Item>(&response));
        assert_eq!(kind, ErrorKind::Validation);
        assert_eq!(message, "bad field");
    }

    #[test]
    fn bad_request_appends_field_errors() {
        let body = r#"{
            "title": "Bad Request",
            "validation-errors": [
                {"request_id": "0", "errors": [
                    {"code": "NotSupportedChoice", "path": "custom_fields_values.0.field_id", "detail": "unknown field"}
                ]}
            ]
        }"#;
        let (kind, message) = failed(classify::<Item>(&HttpResponse::new(400, body)));
        assert_eq!(kind, ErrorKind::Validation);
        assert_eq!(message, "Bad Request (custom_fields_values.0.field_id: unknown field)");
    }

    #[test]
    fn bad_request_with_plain_text_uses_body() {
        let (_, message) = failed(classify::<Item>(&HttpResponse::new(400, "nope\n")));
        assert_eq!(message, "nope");
        let (_, message) = failed(classify::<Item>(&HttpResponse::new(400, "")));
        assert_eq!(message, "bad request");
    }

    #[test]
    fn success_with_blank_body_is_transport() {
        for body in ["", "   \n"] {
            let (kind, message) = failed(classify::<Item>(&HttpResponse::new(200, body)));
            assert_eq!(kind, ErrorKind::Transport);
            assert_eq!(message, MSG_EMPTY_BODY);
        }
    }

    #[test]
    fn success_with_null_body_is_transport() {
        let (kind, message) = failed(classify::<Item>(&HttpResponse::new(200, "null")));
        assert_eq!(kind, ErrorKind::Transport);
        assert_eq!(message, MSG_NULL_BODY);
    }

    #[test]
    fn success_with_wrong_shape_is_parse_error() {
        let (kind, message) = failed(classify::<Item>(&HttpResponse::new(200, "{\"name\":\"x\"}")));
        assert_eq!(kind, ErrorKind::Transport);
        assert_eq!(message, MSG_PARSE_ERROR);
    }

    #[test]
    fn success_with_valid_body_is_ok() {
        assert_eq!(
            classify::<Item>(&HttpResponse::new(201, "{\"id\":7}")),
            Classified::Ok(Item { id: 7 })
        );
    }

    #[test]
    fn other_status_is_transport_with_status_and_body() {
        let (kind, message) = failed(classify::<Item>(&HttpResponse::new(502, "gateway down")));
        assert_eq!(kind, ErrorKind::Transport);
        assert_eq!(message, "502: gateway down");
    }

    #[test]
    fn into_result_maps_variants() {
        assert_eq!(Classified::Ok(1).into_result().unwrap(), Some(1));
        assert_eq!(Classified::<u8>::Empty.into_result().unwrap(), None);
        let err = Classified::<u8>::Failed {
            kind: ErrorKind::Validation,
            message: "x".to_string(),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(ERROR_BODY_PREVIEW_LIMIT);
        let preview = body_preview(&body);
        assert!(preview.ends_with("..."));
        assert!(preview.len() <= ERROR_BODY_PREVIEW_LIMIT + 3);
    }

    #[tracing_test::traced_test]
    #[test]
    fn failures_are_logged() {
        let _ = classify::<Item>(&HttpResponse::new(503, "busy").with_request_echo("GET /x"));
        assert!(logs_contain("503: busy"));
        assert!(logs_contain("GET /x"));
    }
}
