//! Status-code to `ApiError` mapping.
//!
//! Checks run in a fixed order: 401, 403, 404, 422, 429, then any other
//! status >= 400. Everything below 400 is success.

use serde_json::Value;

use crate::error::{ApiError, ErrorDetail};
use crate::http::HttpResponse;

/// Map an error status to the matching `ApiError` kind.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    let status = response.status;
    if status < 400 {
        return Ok(());
    }

    let detail = |message: String| {
        ErrorDetail::new(message)
            .with_status(status)
            .with_body(response.body.as_str())
    };
    let json = error_body(&response.body);
    let server_message = json
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let err = match status {
        401 => ApiError::Authentication(detail("Invalid API key".to_string())),
        403 => {
            let has_limit = json.as_ref().is_some_and(|v| v.get("limit").is_some());
            if has_limit {
                ApiError::LimitExceeded(detail(
                    server_message.unwrap_or_else(|| "Limit exceeded".to_string()),
                ))
            } else {
                ApiError::Request(detail(server_message.unwrap_or_else(|| "Forbidden".to_string())))
            }
        }
        404 => ApiError::NotFound(detail("Resource not found".to_string())),
        422 => ApiError::Validation(detail(
            server_message.unwrap_or_else(|| "Validation failed".to_string()),
        )),
        429 => ApiError::RateLimit {
            detail: detail("Rate limit exceeded".to_string()),
            retry_after: response
                .header("retry-after")
                .and_then(|v| v.trim().parse::<u64>().ok()),
        },
        _ => ApiError::Request(detail(
            server_message.unwrap_or_else(|| format!("Request failed with status {status}")),
        )),
    };
    Err(err)
}

/// Error bodies are only inspected when they are a JSON object.
fn error_body(body: &str) -> Option<Value> {
    serde_json::from_str::<Value>(body).ok().filter(Value::is_object)
}
