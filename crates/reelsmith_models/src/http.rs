//! HTTP helpers shared by the REST clients.

use reelsmith_error::{ReelsmithResult, ServiceError, ServiceErrorKind};

/// Map a reqwest failure to a transport error.
#[track_caller]
pub(crate) fn transport(service: &str, err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::new(
            service,
            ServiceErrorKind::Http {
                status_code: 408,
                message: err.to_string(),
            },
        )
    } else {
        ServiceError::new(service, ServiceErrorKind::Transport(err.to_string()))
    }
}

/// Pass through successful responses, turn the rest into HTTP errors.
pub(crate) async fn check_status(
    service: &str,
    response: reqwest::Response,
) -> ReelsmithResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    tracing::debug!(service, status = status.as_u16(), body = %message, "Service returned error");
    Err(ServiceError::new(
        service,
        ServiceErrorKind::Http {
            status_code: status.as_u16(),
            message,
        },
    )
    .into())
}

/// Extract an HTTP status from error text like
/// `"bad response from server; code 503; description: ..."`.
pub(crate) fn extract_status_code(error_msg: &str) -> Option<u16> {
    let code_start = error_msg.find("code ")?;
    let code_str = &error_msg[code_start + 5..];
    let end = code_str
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(code_str.len());
    code_str[..end].parse().ok()
}
