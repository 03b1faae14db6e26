//! Default headers and query parameters applied to every outbound request.
//!
//! A [`SharedDefaults`] is owned by `Arc` and handed to each gateway that
//! should see it. Gateways built from the same `Arc` observe each other's
//! header/param updates and token rotations; a gateway built without one
//! gets a private instance.
//!
//! Writers do not coordinate: concurrent updates are last-writer-wins.

use courier_core::RequestDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A single default URL parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlParam {
    /// Parameter name
    pub key: String,
    /// Parameter value
    pub value: String,
}

impl UrlParam {
    /// Create a parameter.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Defaults {
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
}

/// Mutable default headers and params shared by one or more gateways.
///
/// # Example
///
/// ```
/// use courier_core::RequestDescriptor;
/// use courier_gateway::defaults::{SharedDefaults, UrlParam};
///
/// let defaults = SharedDefaults::new();
/// defaults.set_header("Authorization", "Bearer t-1");
/// defaults.replace_params(&[UrlParam::new("locale", "en")]);
///
/// let request = defaults.apply_to(RequestDescriptor::get("/users"));
/// assert_eq!(request.header("authorization"), Some("Bearer t-1"));
/// assert_eq!(request.params.get("locale").map(String::as_str), Some("en"));
/// ```
#[derive(Debug, Default)]
pub struct SharedDefaults {
    inner: RwLock<Defaults>,
}

impl SharedDefaults {
    /// Create empty defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a default header, replacing any existing header of the same name
    /// regardless of case.
    pub fn set_header(&self, name: &str, value: &str) {
        let mut defaults = self.write();
        defaults.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
        defaults.headers.insert(name.to_string(), value.to_string());
    }

    /// Current value of a default header, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.read()
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    /// Snapshot of all default headers.
    #[must_use]
    pub fn headers(&self) -> BTreeMap<String, String> {
        self.read().headers.clone()
    }

    /// Replace the whole default-parameter set.
    ///
    /// Parameters not present in `params` are dropped. Later duplicates of a
    /// key win.
    pub fn replace_params(&self, params: &[UrlParam]) {
        let replacement = params
            .iter()
            .map(|param| (param.key.clone(), param.value.clone()))
            .collect();
        self.write().params = replacement;
    }

    /// Snapshot of all default params.
    #[must_use]
    pub fn params(&self) -> BTreeMap<String, String> {
        self.read().params.clone()
    }

    /// Merge the defaults into `request`.
    ///
    /// Values already set on the request win over defaults; header names
    /// are compared without case.
    #[must_use]
    pub fn apply_to(&self, mut request: RequestDescriptor) -> RequestDescriptor {
        let defaults = self.read();

        for (name, value) in &defaults.headers {
            if !request.has_header(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
        for (key, value) in &defaults.params {
            request
                .params
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }

        request
    }

    // A panicking writer cannot leave the maps half-updated, so a poisoned
    // lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, Defaults> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Defaults> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_replace_params_drops_previous_set() {
        let defaults = SharedDefaults::new();
        defaults.replace_params(&[UrlParam::new("a", "1"), UrlParam::new("b", "2")]);
        defaults.replace_params(&[UrlParam::new("c", "3")]);

        let params = defaults.params();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("c").map(String::as_str), Some("3"));
        assert!(!params.contains_key("a"));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let defaults = SharedDefaults::new();
        defaults.set_header("x-token", "old");
        defaults.set_header("X-Token", "new");

        assert_eq!(defaults.headers().len(), 1);
        assert_eq!(defaults.header("X-TOKEN").as_deref(), Some("new"));
    }

    #[test]
    fn test_request_values_win_over_defaults() {
        let defaults = SharedDefaults::new();
        defaults.set_header("Accept", "text/plain");
        defaults.replace_params(&[UrlParam::new("page", "1")]);

        let request = defaults.apply_to(
            RequestDescriptor::get("/items")
                .with_header("accept", "application/json")
                .with_param("page", "7"),
        );

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.params.get("page").map(String::as_str), Some("7"));
    }

    proptest! {
        #[test]
        fn merged_request_contains_every_default(
            headers in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..5),
            params in proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..5),
        ) {
            let defaults = SharedDefaults::new();
            for (name, value) in &headers {
                defaults.set_header(name, value);
            }
            let list: Vec<UrlParam> = params.iter().map(|(k, v)| UrlParam::new(k.clone(), v.clone())).collect();
            defaults.replace_params(&list);

            let request = defaults.apply_to(RequestDescriptor::get("/"));

            prop_assert_eq!(&request.headers, &headers);
            prop_assert_eq!(&request.params, &params);
        }
    }
}
