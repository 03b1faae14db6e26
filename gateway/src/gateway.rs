//! The request gateway

use crate::config::GatewayConfig;
use crate::defaults::{SharedDefaults, UrlParam};
use crate::environment::GatewayEnvironment;
use crate::metrics::{
    BROADCASTS_TOTAL, CALLS_FAILED_TOTAL, CALLS_TOTAL, CALL_DURATION_SECONDS,
    TOKEN_ROTATIONS_TOTAL,
};
use courier_core::environment::{ProgressIndicator, Transport};
use courier_core::{CallerContext, NormalizedError, RequestDescriptor, Response, SpinnerKey};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Server path that receives broadcast actions.
pub const BROADCAST_ACTION_PATH: &str = "/users/broadcastAction";

/// Session storage key holding the broadcast token.
pub const SESSION_TOKEN_KEY: &str = "wsa_token";

/// Wraps a [`Transport`] with correlation tracking, spinner signaling,
/// shared default headers/params, token rotation and centralized error
/// dispatch.
///
/// Calls never panic on transport failures: a fault is reported to the
/// environment's error handler and returned as `Err(NormalizedError)`.
///
/// # Example
///
/// ```ignore
/// let gateway = Gateway::new(config, HttpTransport::new(), GatewayEnvironment::default())
///     .with_context(CallerContext::new("billing", "invoices"));
///
/// match gateway.call(RequestDescriptor::get("/invoices")).await {
///     Ok(response) => render(response.data),
///     Err(error) => tracing::warn!(?error.status, "already reported"),
/// }
/// ```
pub struct Gateway<T> {
    config: Arc<GatewayConfig>,
    transport: T,
    environment: GatewayEnvironment,
    context: Option<CallerContext>,
    defaults: Arc<SharedDefaults>,
}

impl<T: Transport> Gateway<T> {
    /// Create a gateway with its own [`SharedDefaults`].
    ///
    /// Static default URL params from `config` are applied immediately.
    #[must_use]
    pub fn new(config: GatewayConfig, transport: T, environment: GatewayEnvironment) -> Self {
        let gateway = Self {
            config: Arc::new(config),
            transport,
            environment,
            context: None,
            defaults: Arc::new(SharedDefaults::new()),
        };
        gateway.apply_static_params();
        gateway
    }

    /// Attribute every call to `context`.
    #[must_use]
    pub fn with_context(mut self, context: CallerContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Share `defaults` with other gateways.
    ///
    /// Static default URL params from the configuration replace the params
    /// currently held by `defaults`.
    #[must_use]
    pub fn with_shared_defaults(mut self, defaults: Arc<SharedDefaults>) -> Self {
        self.defaults = defaults;
        self.apply_static_params();
        self
    }

    /// The caller context given at construction, if any.
    #[must_use]
    pub const fn context(&self) -> Option<&CallerContext> {
        self.context.as_ref()
    }

    /// The defaults this gateway reads and writes.
    #[must_use]
    pub const fn shared_defaults(&self) -> &Arc<SharedDefaults> {
        &self.defaults
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Set a default header sent with every subsequent call.
    pub fn set_common_header(&self, key: &str, value: &str) {
        self.defaults.set_header(key, value);
    }

    /// Replace the whole default-parameter set.
    ///
    /// This is not a merge: pass the complete desired set.
    pub fn set_common_params(&self, params: &[UrlParam]) {
        self.defaults.replace_params(params);
    }

    /// Post `action` and the session token to the broadcast endpoint.
    ///
    /// Returns `None` without touching the transport or the spinner when
    /// `action` is absent or falsy (`null`, `false`, `0`, `""`).
    pub async fn broadcast_action(
        &self,
        action: Option<Value>,
    ) -> Option<Result<Response, NormalizedError>> {
        let action = action.filter(is_truthy)?;

        let token = self.environment.session.as_ref().map_or_else(
            || json!({}),
            |session| session.get(SESSION_TOKEN_KEY).map_or(Value::Null, Value::String),
        );

        let request = RequestDescriptor::post(BROADCAST_ACTION_PATH)
            .with_base_url(self.config.root_server_url.as_str())
            .with_json(json!({ "action": action, "token": token }));

        metrics::counter!(BROADCASTS_TOTAL).increment(1);
        Some(self.call(request).await)
    }

    /// Issue `request` through the transport.
    ///
    /// Exactly one spinner start and one spinner end are emitted per call,
    /// keyed by the caller identity, the request URL and a fresh
    /// correlation id. The end signal also fires if the returned future is
    /// dropped mid-flight.
    ///
    /// # Errors
    ///
    /// Returns the [`NormalizedError`] built from any transport fault, after
    /// it has been dispatched to the error handler.
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    pub async fn call(&self, request: RequestDescriptor) -> Result<Response, NormalizedError> {
        let correlation_id = self.environment.ids.next_id();
        let caller = CallerContext::resolve(self.context.as_ref());
        let key = SpinnerKey::new(&caller, request.url.as_str(), correlation_id);

        metrics::counter!(CALLS_TOTAL).increment(1);
        let spinner = SpinnerGuard::start(Arc::clone(&self.environment.progress), key);

        let outcome = self.transport.send(self.defaults.apply_to(request)).await;

        spinner.end();

        match outcome {
            Ok(response) => {
                tracing::debug!(%correlation_id, status = response.status, "call succeeded");
                self.rotate_token(&response);
                Ok(response)
            }
            Err(fault) => {
                tracing::warn!(%correlation_id, caller = %caller, error = %fault, "call failed");
                metrics::counter!(CALLS_FAILED_TOTAL).increment(1);

                let error = NormalizedError::from_fault(fault, &caller);
                self.environment.errors.dispatch(&error);
                Err(error)
            }
        }
    }

    fn rotate_token(&self, response: &Response) {
        let Some(header) = self.config.common_authorization_header.as_deref() else {
            return;
        };
        let Some(token) = response.header(header).filter(|value| !value.is_empty()) else {
            return;
        };

        self.set_common_header(header, token);
        metrics::counter!(TOKEN_ROTATIONS_TOTAL).increment(1);
        tracing::debug!(header, "rotated common authorization header");
    }

    fn apply_static_params(&self) {
        if let Some(params) = &self.config.common_url_params {
            self.set_common_params(params);
        }
    }
}

/// Emits the spinner end signal exactly once: on [`SpinnerGuard::end`] or,
/// failing that, on drop. The call duration is recorded alongside it.
struct SpinnerGuard {
    progress: Arc<dyn ProgressIndicator>,
    key: Option<SpinnerKey>,
    started: Instant,
}

impl SpinnerGuard {
    fn start(progress: Arc<dyn ProgressIndicator>, key: SpinnerKey) -> Self {
        progress.start(&key);
        Self {
            progress,
            key: Some(key),
            started: Instant::now(),
        }
    }

    fn end(mut self) {
        self.emit_end();
    }

    fn emit_end(&mut self) {
        if let Some(key) = self.key.take() {
            self.progress.end(&key);
            metrics::histogram!(CALL_DURATION_SECONDS)
                .record(self.started.elapsed().as_secs_f64());
        }
    }
}

impl Drop for SpinnerGuard {
    fn drop(&mut self) {
        self.emit_end();
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{Response, TransportFault};
    use courier_testing::{MockTransport, RecordingProgressIndicator};
    use futures::FutureExt;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(-1)));
        assert!(is_truthy(&json!("LOGOUT")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!({})));
    }

    #[test]
    fn test_spinner_guard_ends_once() {
        let spinner = RecordingProgressIndicator::new();
        let key = SpinnerKey::new(
            &CallerContext::default(),
            "/ping",
            courier_core::CorrelationId::new(),
        );

        let guard = SpinnerGuard::start(Arc::new(spinner.clone()), key.clone());
        guard.end();

        assert_eq!(spinner.starts(), vec![key.clone()]);
        assert_eq!(spinner.ends(), vec![key]);
    }

    #[test]
    fn test_spinner_guard_ends_on_drop() {
        let spinner = RecordingProgressIndicator::new();
        {
            let _guard = SpinnerGuard::start(
                Arc::new(spinner.clone()),
                SpinnerKey::new(&CallerContext::default(), "/x", courier_core::CorrelationId::new()),
            );
        }
        assert!(spinner.is_balanced());
        assert_eq!(spinner.signals().len(), 2);
    }

    #[test]
    fn test_static_params_applied_at_construction() {
        let config = GatewayConfig::new("http://localhost")
            .with_common_url_params(vec![UrlParam::new("locale", "en")]);
        let gateway = Gateway::new(config, MockTransport::new(), GatewayEnvironment::default());

        assert_eq!(
            gateway.shared_defaults().params().get("locale").map(String::as_str),
            Some("en")
        );
    }

    #[test]
    fn test_shared_defaults_receive_static_params() {
        let shared = Arc::new(SharedDefaults::new());
        shared.replace_params(&[UrlParam::new("stale", "1")]);

        let config = GatewayConfig::new("http://localhost")
            .with_common_url_params(vec![UrlParam::new("tenant", "acme")]);
        let gateway = Gateway::new(config, MockTransport::new(), GatewayEnvironment::default())
            .with_shared_defaults(Arc::clone(&shared));

        let params = shared.params();
        assert!(Arc::ptr_eq(gateway.shared_defaults(), &shared));
        assert!(!params.contains_key("stale"));
        assert_eq!(params.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_calls_record_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let transport = MockTransport::new();
        transport.push_response(Response::ok().with_header("X-Token", "abc123"));
        transport.push_fault(TransportFault::network("connection reset"));
        transport.push_response(Response::ok());
        transport.push_hang();
        let config = GatewayConfig::new("http://localhost")
            .with_common_authorization_header("X-Token");
        let gateway = Gateway::new(config, transport, GatewayEnvironment::default());

        metrics::with_local_recorder(&recorder, || {
            let login = futures::executor::block_on(gateway.call(RequestDescriptor::get("/login")));
            assert!(login.is_ok());
            let failed = futures::executor::block_on(gateway.call(RequestDescriptor::get("/fail")));
            assert!(failed.is_err());
            let broadcast =
                futures::executor::block_on(gateway.broadcast_action(Some(json!("PING"))));
            assert!(matches!(broadcast, Some(Ok(_))));
            // Polled once then dropped mid-flight
            assert!(gateway.call(RequestDescriptor::get("/slow")).now_or_never().is_none());
        });

        let rendered = handle.render();
        assert!(rendered.contains(&format!("{CALLS_TOTAL} 4")), "{rendered}");
        assert!(rendered.contains(&format!("{CALLS_FAILED_TOTAL} 1")), "{rendered}");
        assert!(rendered.contains(&format!("{TOKEN_ROTATIONS_TOTAL} 1")), "{rendered}");
        assert!(rendered.contains(&format!("{BROADCASTS_TOTAL} 1")), "{rendered}");
        assert!(
            rendered.contains(&format!("{CALL_DURATION_SECONDS}_count 4")),
            "{rendered}"
        );
    }
}
