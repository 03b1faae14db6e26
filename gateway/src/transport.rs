//! `reqwest`-backed transport

use crate::config::{ConfigError, GatewayConfig};
use courier_core::environment::Transport;
use courier_core::{FaultResponse, Method, RequestDescriptor, Response, TransportFault};
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::BTreeMap;

/// HTTP transport built on a shared `reqwest::Client`.
///
/// Relative URLs are joined onto the descriptor's `base_url`; absolute URLs
/// are used as is. Bodies are decoded as JSON, falling back to a JSON
/// string for other text and `Null` for an empty body. Any non-2xx status
/// becomes a [`TransportFault`] carrying the decoded response.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Build a client honoring the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    async fn execute(&self, request: RequestDescriptor) -> Result<Response, TransportFault> {
        let url = resolve_url(request.base_url.as_deref(), &request.url);

        let mut builder = self.client.request(to_reqwest_method(request.method), &url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportFault::network(format!("{} {url}: {e}", request.method)))?;

        let status = response.status();
        let headers = collect_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map(|bytes| decode_body(&bytes))
            .map_err(|e| format!("Failed to read response body: {e}"));

        into_outcome(&format!("{} {url}", request.method), status, headers, body)
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<Response, TransportFault> {
        self.execute(request).await
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

/// A body read failure on a non-2xx status still yields a fault carrying the
/// status and headers, with `Null` data.
fn into_outcome(
    target: &str,
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Result<Value, String>,
) -> Result<Response, TransportFault> {
    if status.is_success() {
        let data = body.map_err(TransportFault::network)?;
        return Ok(Response {
            status: status.as_u16(),
            headers,
            data,
        });
    }

    let (message, data) = match body {
        Ok(data) => (format!("{target} returned {status}"), data),
        Err(read_error) => (format!("{target} returned {status}: {read_error}"), Value::Null),
    };
    Err(TransportFault::with_response(
        message,
        FaultResponse {
            status: status.as_u16(),
            headers,
            data,
        },
    ))
}

fn resolve_url(base_url: Option<&str>, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    match base_url {
        Some(base) if !url.is_empty() => format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ),
        Some(base) => base.to_string(),
        None => url.to_string(),
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

fn decode_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url(Some("https://api.example.com/"), "/users/broadcastAction"),
            "https://api.example.com/users/broadcastAction"
        );
        assert_eq!(
            resolve_url(Some("https://api.example.com"), "users"),
            "https://api.example.com/users"
        );
        assert_eq!(
            resolve_url(Some("https://api.example.com"), "http://other.host/x"),
            "http://other.host/x"
        );
        assert_eq!(resolve_url(None, "http://h/y"), "http://h/y");
        assert_eq!(resolve_url(Some("http://h"), ""), "http://h");
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(b""), Value::Null);
        assert_eq!(decode_body(br#"{"msg":"boom"}"#), json!({ "msg": "boom" }));
        assert_eq!(decode_body(b"plain text"), json!("plain text"));
    }

    #[test]
    fn test_unreadable_error_body_keeps_status() {
        let headers = BTreeMap::from([("x-request-id".to_string(), "r1".to_string())]);
        let outcome = into_outcome(
            "GET http://h/x",
            StatusCode::BAD_GATEWAY,
            headers.clone(),
            Err("Failed to read response body: connection closed".to_string()),
        );

        let fault = outcome.err().and_then(|fault| fault.response);
        assert_eq!(
            fault,
            Some(FaultResponse {
                status: 502,
                headers,
                data: Value::Null,
            })
        );
    }

    #[test]
    fn test_unreadable_success_body_is_network_fault() {
        let outcome = into_outcome(
            "GET http://h/x",
            StatusCode::OK,
            BTreeMap::new(),
            Err("Failed to read response body: connection closed".to_string()),
        );

        assert!(outcome.is_err_and(|fault| fault.response.is_none()));
    }

    #[test]
    fn test_error_status_carries_decoded_body() {
        let outcome = into_outcome(
            "POST http://h/x",
            StatusCode::INTERNAL_SERVER_ERROR,
            BTreeMap::new(),
            Ok(json!({ "msg": "boom" })),
        );

        let fault = outcome.err().and_then(|fault| fault.response);
        assert_eq!(fault.map(|r| (r.status, r.data)), Some((500, json!({ "msg": "boom" }))));
    }
}
