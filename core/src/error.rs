//! Transport faults and the normalized error shape handed to callers.

use crate::context::CallerContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Response payload attached to a transport fault.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaultResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lower-cased names)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Decoded response body
    #[serde(default)]
    pub data: Value,
}

impl FaultResponse {
    /// Create a fault payload with a status and body.
    #[must_use]
    pub const fn new(status: u16, data: Value) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            data,
        }
    }
}

/// Any failure surfaced by a transport.
///
/// Network errors carry no `response`; non-2xx replies carry the status,
/// headers and body the server sent.
#[derive(Clone, Debug, PartialEq, Error)]
#[error("Transport failure: {message}")]
pub struct TransportFault {
    /// Human-readable description
    pub message: String,
    /// Server response, when one was received
    pub response: Option<FaultResponse>,
}

impl TransportFault {
    /// A fault that happened before any response was received.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    /// A fault carrying the server's response.
    #[must_use]
    pub fn with_response(message: impl Into<String>, response: FaultResponse) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }

    /// A fault for a non-2xx status with the given body.
    #[must_use]
    pub fn status(status: u16, data: Value) -> Self {
        Self::with_response(
            format!("Request failed with status {status}"),
            FaultResponse::new(status, data),
        )
    }
}

/// Uniform error returned by a failed gateway call.
///
/// Holds the fault's response payload (absent fields when no response was
/// received) plus the caller's identity. Serializes to the flat object
/// `{ status, data, headers, appId, subAppId }`, omitting what is absent.
///
/// # Examples
///
/// ```
/// use courier_core::context::CallerContext;
/// use courier_core::error::{NormalizedError, TransportFault};
/// use serde_json::json;
///
/// let fault = TransportFault::status(500, json!({ "msg": "boom" }));
/// let error = NormalizedError::from_fault(fault, &CallerContext::default());
///
/// assert_eq!(
///     serde_json::to_value(&error).unwrap_or_default(),
///     json!({ "status": 500, "data": { "msg": "boom" }, "appId": "mainApp", "subAppId": "subMainApp" }),
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("Request from {app_id}/{sub_app_id} failed (status: {status:?})")]
pub struct NormalizedError {
    /// HTTP status of the failed response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Body of the failed response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Headers of the failed response
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// App id of the caller
    pub app_id: String,
    /// Sub-app id of the caller
    pub sub_app_id: String,
}

impl NormalizedError {
    /// Normalize a transport fault on behalf of `caller`.
    #[must_use]
    pub fn from_fault(fault: TransportFault, caller: &CallerContext) -> Self {
        let (status, data, headers) = match fault.response {
            Some(response) => (Some(response.status), Some(response.data), response.headers),
            None => (None, None, BTreeMap::new()),
        };

        Self {
            status,
            data,
            headers,
            app_id: caller.app_id().to_string(),
            sub_app_id: caller.sub_app_id().to_string(),
        }
    }

    /// Whether the fault carried a server response.
    #[must_use]
    pub const fn has_response(&self) -> bool {
        self.status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fault_without_response_normalizes_to_ids_only() {
        let error = NormalizedError::from_fault(
            TransportFault::network("connection refused"),
            &CallerContext::new("shop", "cart"),
        );

        assert!(!error.has_response());
        assert_eq!(
            serde_json::to_value(&error).unwrap_or_default(),
            json!({ "appId": "shop", "subAppId": "cart" })
        );
    }

    #[test]
    fn test_fault_headers_are_kept() {
        let mut response = FaultResponse::new(401, json!(null));
        response.headers.insert("www-authenticate".to_string(), "Bearer".to_string());

        let error = NormalizedError::from_fault(
            TransportFault::with_response("unauthorized", response),
            &CallerContext::default(),
        );

        assert_eq!(error.status, Some(401));
        assert_eq!(error.headers.get("www-authenticate").map(String::as_str), Some("Bearer"));
    }

    #[test]
    fn test_display_mentions_caller() {
        let error = NormalizedError::from_fault(
            TransportFault::status(503, json!("unavailable")),
            &CallerContext::default(),
        );
        let message = error.to_string();
        assert!(message.contains("mainApp/subMainApp"));
        assert!(message.contains("503"));
    }
}
