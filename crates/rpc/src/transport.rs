//! Request/response transport to a single endpoint.

use crate::{RpcError, RpcRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Default per-request timeout for [`HttpTransport`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends one request and returns the `result` object of the response.
///
/// Implementations must map `status: error` responses to
/// [`RpcError::Server`]; [`extract_result`] does this for a raw body.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError>;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        (**self).call(request).await
    }
}

/// Pull the `result` object out of a response body.
///
/// Servers disagree on where errors go: the full node nests them inside
/// `result`, the API server may put them at the top level.
pub fn extract_result(method: &str, mut body: Value) -> Result<Value, RpcError> {
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(server_error(method, error, &body));
    }

    let result = match body.get_mut("result") {
        Some(result) if result.is_object() => result.take(),
        _ => {
            return Err(RpcError::MissingResult {
                method: method.to_string(),
            })
        }
    };

    if result.get("status").and_then(Value::as_str) == Some("error") {
        let error = result
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(server_error(method, error, &result));
    }

    Ok(result)
}

fn server_error(method: &str, error: &str, body: &Value) -> RpcError {
    RpcError::Server {
        method: method.to_string(),
        error: error.to_string(),
        message: body
            .get("error_message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// HTTP transport for a live endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default request timeout.
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a transport with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, request: &RpcRequest) -> Result<Value, RpcError> {
        trace!(url = %self.url, method = %request.method, "POST");

        let response = self.http.post(&self.url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Status(status.as_u16()));
        }

        let body: Value = response.json().await?;
        extract_result(&request.method, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_success_result() {
        let body = json!({ "result": { "status": "success", "ledger_current_index": 9 } });
        let result = extract_result("ledger_current", body).unwrap();
        assert_eq!(result["ledger_current_index"], 9);
    }

    #[test]
    fn test_extract_nested_error() {
        let body = json!({
            "result": {
                "status": "error",
                "error": "actNotFound",
                "error_message": "Account not found."
            }
        });
        match extract_result("account_lines", body) {
            Err(RpcError::Server { error, message, .. }) => {
                assert_eq!(error, "actNotFound");
                assert_eq!(message.as_deref(), Some("Account not found."));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_top_level_error() {
        let body = json!({ "error": "notReady", "status": "error" });
        assert!(matches!(
            extract_result("ledger", body),
            Err(RpcError::Server { error, .. }) if error == "notReady"
        ));
    }

    #[test]
    fn test_extract_missing_result() {
        assert!(matches!(
            extract_result("submit", json!({ "id": 1 })),
            Err(RpcError::MissingResult { .. })
        ));
        assert!(matches!(
            extract_result("submit", json!({ "result": "oops" })),
            Err(RpcError::MissingResult { .. })
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_http_error() {
        let transport =
            HttpTransport::with_timeout("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let request = RpcRequest::new("server_info", json!({}));

        let result = tokio_test::block_on(transport.call(&request));
        assert!(matches!(result, Err(RpcError::Http(_))));
    }
}
