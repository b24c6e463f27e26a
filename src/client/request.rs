//! Request primitives shared by the GLPI clients
//!
//! Status classification, GLPI error-body parsing, and the timeout/cancel
//! guard every outbound call runs under.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// GLPI error codes that mean the session token is no longer usable
const TOKEN_ERRORS: [&str; 2] = ["ERROR_SESSION_TOKEN_INVALID", "ERROR_SESSION_TOKEN_MISSING"];

/// GLPI error codes that mean the profile lacks the right
const RIGHT_ERRORS: [&str; 2] = ["ERROR_RIGHT_MISSING", "ERROR_NOT_ALLOWED"];

/// Per-call options for [`GlpiClient::request`](super::GlpiClient::request)
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Cache TTL for this read; the configured default when `None`
    pub ttl: Option<Duration>,
    /// Skip the cache lookup (the fresh response is still stored)
    pub bypass_cache: bool,
    /// Overrides the configured request timeout
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn queries<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Turn a finished HTTP exchange into JSON or an [`ApiError`].
///
/// GLPI reports failures as `["ERROR_CODE", "message"]`; the code wins over
/// the status for token and rights errors.
pub fn classify_response(status: StatusCode, body: &str) -> Result<Value, ApiError> {
    if status.is_success() {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
        });
    }

    let (code, message) = parse_glpi_error(body);
    let detail = match (&code, message) {
        (Some(code), Some(message)) => format!("{}: {}", code, message),
        (Some(code), None) => code.clone(),
        (None, Some(message)) => message,
        (None, None) => status.to_string(),
    };

    if let Some(code) = code.as_deref() {
        if TOKEN_ERRORS.contains(&code) {
            return Err(ApiError::Unauthorized);
        }
        if RIGHT_ERRORS.contains(&code) {
            return Err(ApiError::Forbidden(detail));
        }
    }

    Err(match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized,
        StatusCode::FORBIDDEN => ApiError::Forbidden(detail),
        StatusCode::NOT_FOUND => ApiError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::BadRequest(detail)
        }
        status if status.is_server_error() => ApiError::ServerError {
            status: status.as_u16(),
            message: detail,
        },
        status => ApiError::InvalidResponse(format!("Unexpected status code: {}", status)),
    })
}

/// Extract `(code, message)` from a GLPI error body.
///
/// Non-JSON bodies are kept as the message.
fn parse_glpi_error(body: &str) -> (Option<String>, Option<String>) {
    let body = body.trim();
    if body.is_empty() {
        return (None, None);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => {
            let code = items.first().and_then(Value::as_str).map(str::to_string);
            let message = items.get(1).and_then(Value::as_str).map(str::to_string);
            (code, message)
        }
        Ok(Value::String(s)) => (None, Some(s)),
        _ => (None, Some(body.to_string())),
    }
}

/// Run `fut` under a deadline and an optional cancellation token.
pub async fn guarded<F, T>(
    fut: F,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let timed = tokio::time::timeout(timeout, fut);

    let outcome = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ApiError::Cancelled),
                res = timed => res,
            }
        }
        None => timed.await,
    };

    outcome.unwrap_or(Err(ApiError::Timeout))
}
