//! # Courier Testing
//!
//! Testing utilities and recording doubles for the Courier request gateway.
//!
//! This crate provides:
//! - Recording implementations of the environment traits (progress
//!   indicator, error handler)
//! - In-memory session storage and a deterministic id generator
//! - A scripted [`MockTransport`] that records every request it receives,
//!   with gated replies for holding calls in flight
//!
//! ## Example
//!
//! ```ignore
//! use courier_testing::{MockTransport, RecordingProgressIndicator};
//!
//! #[tokio::test]
//! async fn test_call_signals_spinner() {
//!     let transport = MockTransport::new();
//!     let spinner = RecordingProgressIndicator::new();
//!     let gateway = test_gateway(transport.clone(), spinner.clone());
//!
//!     let _ = gateway.call(RequestDescriptor::get("/ping")).await;
//!
//!     assert!(spinner.is_balanced());
//! }
//! ```

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Mutex poisoning only happens after a test already panicked

pub mod transport_mocks;

/// Recording implementations of the gateway's environment traits.
pub mod mocks {
    use courier_core::environment::{ErrorHandler, IdGenerator, ProgressIndicator, SessionStorage};
    use courier_core::{CorrelationId, NormalizedError, SpinnerKey};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    /// One signal observed by a [`RecordingProgressIndicator`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum SpinnerSignal {
        /// `start` was called
        Start(SpinnerKey),
        /// `end` was called
        End(SpinnerKey),
    }

    impl SpinnerSignal {
        /// The key carried by the signal.
        #[must_use]
        pub const fn key(&self) -> &SpinnerKey {
            match self {
                Self::Start(key) | Self::End(key) => key,
            }
        }
    }

    /// Progress indicator that remembers every signal in order.
    ///
    /// Clones share the same log.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingProgressIndicator {
        signals: Arc<Mutex<Vec<SpinnerSignal>>>,
    }

    impl RecordingProgressIndicator {
        /// Create an empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All signals, in emission order.
        #[must_use]
        pub fn signals(&self) -> Vec<SpinnerSignal> {
            self.signals.lock().unwrap().clone()
        }

        /// Keys of all `start` signals.
        #[must_use]
        pub fn starts(&self) -> Vec<SpinnerKey> {
            self.signals()
                .into_iter()
                .filter_map(|signal| match signal {
                    SpinnerSignal::Start(key) => Some(key),
                    SpinnerSignal::End(_) => None,
                })
                .collect()
        }

        /// Keys of all `end` signals.
        #[must_use]
        pub fn ends(&self) -> Vec<SpinnerKey> {
            self.signals()
                .into_iter()
                .filter_map(|signal| match signal {
                    SpinnerSignal::End(key) => Some(key),
                    SpinnerSignal::Start(_) => None,
                })
                .collect()
        }

        /// Every start has exactly one matching end that comes after it.
        #[must_use]
        pub fn is_balanced(&self) -> bool {
            let signals = self.signals();
            let mut open: HashMap<SpinnerKey, usize> = HashMap::new();

            for signal in &signals {
                match signal {
                    SpinnerSignal::Start(key) => *open.entry(key.clone()).or_default() += 1,
                    SpinnerSignal::End(key) => match open.get_mut(key) {
                        Some(count) if *count > 0 => *count -= 1,
                        _ => return false,
                    },
                }
            }

            open.values().all(|count| *count == 0)
        }

        /// Forget everything recorded so far.
        pub fn clear(&self) {
            self.signals.lock().unwrap().clear();
        }
    }

    impl ProgressIndicator for RecordingProgressIndicator {
        fn start(&self, key: &SpinnerKey) {
            self.signals
                .lock()
                .unwrap()
                .push(SpinnerSignal::Start(key.clone()));
        }

        fn end(&self, key: &SpinnerKey) {
            self.signals
                .lock()
                .unwrap()
                .push(SpinnerSignal::End(key.clone()));
        }
    }

    /// Error handler that keeps every dispatched error.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingErrorHandler {
        errors: Arc<Mutex<Vec<NormalizedError>>>,
    }

    impl RecordingErrorHandler {
        /// Create an empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// All dispatched errors, in order.
        #[must_use]
        pub fn dispatched(&self) -> Vec<NormalizedError> {
            self.errors.lock().unwrap().clone()
        }

        /// Number of dispatched errors.
        #[must_use]
        pub fn len(&self) -> usize {
            self.errors.lock().unwrap().len()
        }

        /// Whether nothing has been dispatched.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl ErrorHandler for RecordingErrorHandler {
        fn dispatch(&self, error: &NormalizedError) {
            self.errors.lock().unwrap().push(error.clone());
        }
    }

    /// `HashMap`-backed session storage.
    #[derive(Debug, Clone, Default)]
    pub struct InMemorySessionStorage {
        values: Arc<Mutex<HashMap<String, String>>>,
    }

    impl InMemorySessionStorage {
        /// Create empty storage.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Store `value` under `key`.
        pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
            self.values.lock().unwrap().insert(key.into(), value.into());
        }

        /// Remove the value under `key`.
        pub fn remove(&self, key: &str) {
            self.values.lock().unwrap().remove(key);
        }
    }

    impl SessionStorage for InMemorySessionStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }
    }

    /// Deterministic ids: `00000000-0000-0000-0000-000000000001`, `...02`, ...
    #[derive(Debug)]
    pub struct SequentialIdGenerator {
        next: AtomicU64,
    }

    impl SequentialIdGenerator {
        /// Start counting from 1.
        #[must_use]
        pub const fn new() -> Self {
            Self {
                next: AtomicU64::new(1),
            }
        }
    }

    impl Default for SequentialIdGenerator {
        fn default() -> Self {
            Self::new()
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> CorrelationId {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            CorrelationId::from_uuid(Uuid::from_u128(u128::from(n)))
        }
    }
}

// Re-export commonly used items
pub use mocks::{
    InMemorySessionStorage, RecordingErrorHandler, RecordingProgressIndicator,
    SequentialIdGenerator, SpinnerSignal,
};
pub use transport_mocks::{MockTransport, ReplyGate};
