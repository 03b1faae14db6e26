//! Caller identity and per-call correlation types.
//!
//! Every request issued through a gateway is attributed to a logical
//! sub-application ([`CallerContext`]) and tagged with a fresh
//! [`CorrelationId`]. Together with the request URL they form the
//! [`SpinnerKey`] that pairs progress start/end signals.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// App id used when a gateway has no caller context.
pub const DEFAULT_APP_ID: &str = "mainApp";

/// Sub-app id used when a gateway has no caller context.
pub const DEFAULT_SUB_APP_ID: &str = "subMainApp";

/// Identity of the logical sub-application issuing requests.
///
/// # Examples
///
/// ```
/// use courier_core::context::CallerContext;
///
/// let resolved = CallerContext::resolve(None);
/// assert_eq!(resolved.app_id(), "mainApp");
/// assert_eq!(resolved.sub_app_id(), "subMainApp");
///
/// let billing = CallerContext::new("billing", "invoices");
/// let resolved = CallerContext::resolve(Some(&billing));
/// assert_eq!(resolved.app_id(), "billing");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerContext {
    app_id: String,
    sub_app_id: String,
}

impl CallerContext {
    /// Create a caller context from an app id and a sub-app id.
    #[must_use]
    pub fn new(app_id: impl Into<String>, sub_app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            sub_app_id: sub_app_id.into(),
        }
    }

    /// Resolve the effective identity for a call.
    ///
    /// Missing contexts and empty fields fall back to
    /// [`DEFAULT_APP_ID`] / [`DEFAULT_SUB_APP_ID`] independently.
    #[must_use]
    pub fn resolve(context: Option<&Self>) -> Self {
        Self {
            app_id: non_empty_or(context.map(|c| c.app_id.as_str()), DEFAULT_APP_ID),
            sub_app_id: non_empty_or(context.map(|c| c.sub_app_id.as_str()), DEFAULT_SUB_APP_ID),
        }
    }

    /// The app id.
    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The sub-app id.
    #[must_use]
    pub fn sub_app_id(&self) -> &str {
        &self.sub_app_id
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

impl Default for CallerContext {
    fn default() -> Self {
        Self::new(DEFAULT_APP_ID, DEFAULT_SUB_APP_ID)
    }
}

impl fmt::Display for CallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_id, self.sub_app_id)
    }
}

/// Per-call identifier pairing progress start and end signals.
///
/// Not persisted and never handed back to the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a random (v4) correlation id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key under which a progress indicator tracks one in-flight call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinnerKey {
    /// Resolved app id of the caller
    pub app_id: String,
    /// Resolved sub-app id of the caller
    pub sub_app_id: String,
    /// Request URL (path) as given by the caller
    pub url: String,
    /// Correlation id of the call
    pub correlation_id: CorrelationId,
}

impl SpinnerKey {
    /// Build the key for a call made by `caller` against `url`.
    #[must_use]
    pub fn new(caller: &CallerContext, url: impl Into<String>, correlation_id: CorrelationId) -> Self {
        Self {
            app_id: caller.app_id.clone(),
            sub_app_id: caller.sub_app_id.clone(),
            url: url.into(),
            correlation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults_when_absent() {
        let resolved = CallerContext::resolve(None);
        assert_eq!(resolved, CallerContext::default());
    }

    #[test]
    fn test_resolve_fills_empty_fields_individually() {
        let partial = CallerContext::new("billing", "");
        let resolved = CallerContext::resolve(Some(&partial));
        assert_eq!(resolved.app_id(), "billing");
        assert_eq!(resolved.sub_app_id(), DEFAULT_SUB_APP_ID);
    }

    #[test]
    fn test_correlation_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn test_spinner_key_copies_caller_identity() {
        let caller = CallerContext::new("a", "b");
        let id = CorrelationId::from_uuid(Uuid::from_u128(7));
        let key = SpinnerKey::new(&caller, "/users", id);
        assert_eq!(key.app_id, "a");
        assert_eq!(key.sub_app_id, "b");
        assert_eq!(key.url, "/users");
        assert_eq!(key.correlation_id, id);
    }

    proptest::proptest! {
        #[test]
        fn resolved_ids_are_never_empty(app in "[a-z]{0,6}", sub in "[a-z]{0,6}") {
            let context = CallerContext::new(app.clone(), sub.clone());
            let resolved = CallerContext::resolve(Some(&context));

            proptest::prop_assert!(!resolved.app_id().is_empty());
            proptest::prop_assert!(!resolved.sub_app_id().is_empty());
            if !app.is_empty() {
                proptest::prop_assert_eq!(resolved.app_id(), app.as_str());
            }
            if !sub.is_empty() {
                proptest::prop_assert_eq!(resolved.sub_app_id(), sub.as_str());
            }
        }
    }
}
