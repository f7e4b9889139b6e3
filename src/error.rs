use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no API key configured for the generative-language endpoint")]
    Configuration,
    #[error("model API error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("model returned no candidate text")]
    EmptyResponse,
    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to parse model response JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history store is not configured: {0}")]
    Configuration(String),
    #[error("history store error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("history store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode history data: {0}")]
    Decode(String),
    #[error("history file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid history cursor")]
    InvalidCursor,
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Pulls a readable message out of a Google-style `{"error": {...}}` body.
pub(crate) fn extract_api_error(body: &str) -> Option<String> {
    #[derive(serde::Deserialize)]
    struct ApiError {
        message: Option<String>,
        status: Option<String>,
        code: Option<i32>,
    }

    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    // Firestore wraps errors of runQuery in a one-element array.
    let value = match value {
        serde_json::Value::Array(items) => items.into_iter().next()?,
        other => other,
    };
    let error = value.get("error")?.clone();
    let error: ApiError = serde_json::from_value(error).ok()?;
    Some(format_error_parts(
        error.message,
        error.status,
        error.code.map(|value| value.to_string()),
    ))
}

pub(crate) fn upstream_message(body: &str) -> String {
    extract_api_error(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            "unknown error".to_string()
        } else {
            trimmed.to_string()
        }
    })
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    for (label, value) in [("", message), ("type: ", kind), ("code: ", code)] {
        if let Some(value) = value {
            if !value.trim().is_empty() {
                parts.push(format!("{}{}", label, value));
            }
        }
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_google_error_body() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_api_error(body).as_deref(),
            Some("API key not valid | type: INVALID_ARGUMENT | code: 400")
        );
    }

    #[test]
    fn extracts_wrapped_error_body() {
        let body = r#"[{"error":{"code":403,"message":"denied"}}]"#;
        assert_eq!(
            extract_api_error(body).as_deref(),
            Some("denied | code: 403")
        );
    }

    #[test]
    fn wrapped_body_without_error_is_not_extracted() {
        assert_eq!(extract_api_error("[]"), None);
        assert_eq!(extract_api_error(r#"[{"status":"ok"}]"#), None);
        assert_eq!(
            upstream_message(r#"[{"error":{"status":"PERMISSION_DENIED"}}]"#),
            "type: PERMISSION_DENIED"
        );
    }

    #[test]
    fn upstream_message_falls_back_to_raw_body() {
        assert_eq!(upstream_message("  gateway timeout \n"), "gateway timeout");
        assert_eq!(upstream_message(""), "unknown error");
    }
}
