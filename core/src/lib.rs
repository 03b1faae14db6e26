//! # Courier Core
//!
//! Core types and environment traits for the Courier request gateway.
//!
//! The gateway itself lives in `courier-gateway`; this crate holds the
//! vocabulary shared between the gateway, its transports and the test
//! doubles in `courier-testing`.
//!
//! ## Core Concepts
//!
//! - **`RequestDescriptor`**: what to send (method, URL, headers, params, body)
//! - **`Response`** / **`TransportFault`**: what a transport hands back
//! - **`CallerContext`**: which sub-application is calling
//! - **`CorrelationId`** / **`SpinnerKey`**: pairing of progress signals
//! - **`NormalizedError`**: the uniform failure value returned by a call
//! - **Environment**: injected collaborators (transport, progress indicator,
//!   error handler, session storage, id generator)
//!
//! ## Example
//!
//! ```ignore
//! use courier_core::environment::{ProgressIndicator, Transport};
//!
//! struct Spinner;
//!
//! impl ProgressIndicator for Spinner {
//!     fn start(&self, key: &SpinnerKey) { /* show */ }
//!     fn end(&self, key: &SpinnerKey) { /* hide */ }
//! }
//! ```

pub mod context;
pub mod error;
pub mod request;

pub use context::{CallerContext, CorrelationId, SpinnerKey, DEFAULT_APP_ID, DEFAULT_SUB_APP_ID};
pub use error::{FaultResponse, NormalizedError, TransportFault};
pub use request::{Method, RequestDescriptor, Response};

/// Environment module - Dependency injection traits
///
/// Every collaborator the gateway talks to is abstracted behind one of
/// these traits and injected at construction. Production implementations
/// live in `courier-gateway`; recording implementations for tests live in
/// `courier-testing`.
pub mod environment {
    use crate::context::{CorrelationId, SpinnerKey};
    use crate::error::{NormalizedError, TransportFault};
    use crate::request::{RequestDescriptor, Response};
    use std::future::Future;
    use std::sync::Arc;

    /// Performs HTTP requests.
    ///
    /// Implementations map every failure (connection errors, non-2xx
    /// statuses, body decoding errors) to a [`TransportFault`]. Timeouts and
    /// cancellation are the transport's business.
    pub trait Transport: Send + Sync {
        /// Send a request and wait for its outcome.
        fn send(
            &self,
            request: RequestDescriptor,
        ) -> impl Future<Output = Result<Response, TransportFault>> + Send;
    }

    /// Loading indicator notified around every call.
    ///
    /// Both methods are fire-and-forget.
    pub trait ProgressIndicator: Send + Sync {
        /// A call identified by `key` has started.
        fn start(&self, key: &SpinnerKey);

        /// The call identified by `key` has ended.
        fn end(&self, key: &SpinnerKey);
    }

    /// Central sink for failed calls. Fire-and-forget.
    pub trait ErrorHandler: Send + Sync {
        /// Report a failed call.
        fn dispatch(&self, error: &NormalizedError);
    }

    /// Client-local key/value session storage.
    pub trait SessionStorage: Send + Sync {
        /// Read the value stored under `key`.
        fn get(&self, key: &str) -> Option<String>;
    }

    /// Source of correlation ids.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier_core::environment::{IdGenerator, RandomIdGenerator};
    ///
    /// let ids = RandomIdGenerator;
    /// assert_ne!(ids.next_id(), ids.next_id());
    /// ```
    pub trait IdGenerator: Send + Sync {
        /// Produce a fresh id.
        fn next_id(&self) -> CorrelationId;
    }

    /// Random v4 UUIDs.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomIdGenerator;

    impl IdGenerator for RandomIdGenerator {
        fn next_id(&self) -> CorrelationId {
            CorrelationId::new()
        }
    }

    impl<T: Transport> Transport for Arc<T> {
        fn send(
            &self,
            request: RequestDescriptor,
        ) -> impl Future<Output = Result<Response, TransportFault>> + Send {
            (**self).send(request)
        }
    }
}
