//! Shared HTTP plumbing for the backends.

use std::time::Duration;

use crate::error::OracleError;

/// Build a client with a whole-request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client, OracleError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| OracleError::NetworkError(format!("failed to build HTTP client: {e}")))
}

/// Map a transport failure.
pub(crate) fn send_error(e: reqwest::Error, timeout_secs: u64) -> OracleError {
    if e.is_timeout() {
        OracleError::Timeout(timeout_secs)
    } else {
        OracleError::NetworkError(e.to_string())
    }
}

/// Turn non-success statuses into typed errors, passing successes through.
///
/// `extract_message` pulls a readable message out of an error body.
pub(crate) async fn check_status(
    response: reqwest::Response,
    model: &str,
    extract_message: fn(&str) -> Option<String>,
) -> Result<reqwest::Response, OracleError> {
    let status = response.status().as_u16();
    if status < 400 {
        return Ok(response);
    }

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5)
            * 1000;
        return Err(OracleError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or(body);
    Err(match status {
        401 | 403 => OracleError::AuthenticationFailed(message),
        404 => OracleError::ModelNotFound(model.to_string()),
        _ => OracleError::ApiError { status, message },
    })
}
