//! Injected collaborators of a [`Gateway`](crate::Gateway).
//!
//! [`GatewayEnvironment`] bundles the progress indicator, error handler,
//! session storage and id generator. The default environment logs spinner
//! signals and errors through `tracing`, generates random correlation ids
//! and has no session storage.

use courier_core::environment::{
    ErrorHandler, IdGenerator, ProgressIndicator, RandomIdGenerator, SessionStorage,
};
use courier_core::{NormalizedError, SpinnerKey};
use std::fmt;
use std::sync::Arc;

/// Progress indicator that only emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressIndicator;

impl ProgressIndicator for TracingProgressIndicator {
    fn start(&self, key: &SpinnerKey) {
        tracing::debug!(
            app_id = %key.app_id,
            sub_app_id = %key.sub_app_id,
            url = %key.url,
            correlation_id = %key.correlation_id,
            "spinner start"
        );
    }

    fn end(&self, key: &SpinnerKey) {
        tracing::debug!(
            app_id = %key.app_id,
            sub_app_id = %key.sub_app_id,
            url = %key.url,
            correlation_id = %key.correlation_id,
            "spinner end"
        );
    }
}

/// Error handler that logs every failed call at `error` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorHandler;

impl ErrorHandler for TracingErrorHandler {
    fn dispatch(&self, error: &NormalizedError) {
        tracing::error!(
            app_id = %error.app_id,
            sub_app_id = %error.sub_app_id,
            status = ?error.status,
            data = ?error.data,
            "request failed"
        );
    }
}

/// Collaborators a gateway signals and reads from.
///
/// # Example
///
/// ```ignore
/// let environment = GatewayEnvironment::new(Arc::new(MySpinner), Arc::new(MyErrorSink))
///     .with_session_storage(Arc::new(BrowserSession::default()));
/// ```
#[derive(Clone)]
pub struct GatewayEnvironment {
    pub(crate) progress: Arc<dyn ProgressIndicator>,
    pub(crate) errors: Arc<dyn ErrorHandler>,
    pub(crate) session: Option<Arc<dyn SessionStorage>>,
    pub(crate) ids: Arc<dyn IdGenerator>,
}

impl GatewayEnvironment {
    /// Create an environment with the given spinner and error sink, random
    /// correlation ids and no session storage.
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressIndicator>, errors: Arc<dyn ErrorHandler>) -> Self {
        Self {
            progress,
            errors,
            session: None,
            ids: Arc::new(RandomIdGenerator),
        }
    }

    /// Attach session storage (read by `broadcast_action`).
    #[must_use]
    pub fn with_session_storage(mut self, session: Arc<dyn SessionStorage>) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the correlation id source.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

impl Default for GatewayEnvironment {
    fn default() -> Self {
        Self::new(Arc::new(TracingProgressIndicator), Arc::new(TracingErrorHandler))
    }
}

impl fmt::Debug for GatewayEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayEnvironment")
            .field("session", &self.session.is_some())
            .finish_non_exhaustive()
    }
}
