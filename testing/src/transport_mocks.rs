//! Scripted transport for gateway tests
//!
//! [`MockTransport`] replays queued outcomes in order and records every
//! request it is handed, after shared defaults have been merged in. Once
//! the script runs dry it answers `200 OK` with an empty body.

use courier_core::environment::Transport;
use courier_core::{RequestDescriptor, Response, TransportFault};
use futures::channel::oneshot;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

enum Scripted {
    Reply(Result<Response, TransportFault>),
    Gated(oneshot::Receiver<()>, Result<Response, TransportFault>),
    Hang,
}

/// Holds back a gated reply until released.
///
/// Dropping the gate releases the reply as well.
#[derive(Debug)]
pub struct ReplyGate(oneshot::Sender<()>);

impl ReplyGate {
    /// Let the gated call complete.
    pub fn release(self) {
        let _ = self.0.send(());
    }
}

#[derive(Default)]
struct MockState {
    script: VecDeque<Scripted>,
    requests: Vec<RequestDescriptor>,
}

/// In-memory transport with a queue of canned outcomes.
///
/// Clones share the same script and request log.
///
/// # Example
///
/// ```
/// use courier_core::environment::Transport;
/// use courier_core::{RequestDescriptor, Response};
/// use courier_testing::MockTransport;
///
/// # async fn example() {
/// let transport = MockTransport::new();
/// transport.push_response(Response::new(201));
///
/// let first = transport.send(RequestDescriptor::post("/items")).await;
/// assert_eq!(first.map(|r| r.status), Ok(201));
///
/// // Script exhausted: defaults to 200
/// let second = transport.send(RequestDescriptor::get("/items")).await;
/// assert_eq!(second.map(|r| r.status), Ok(200));
///
/// assert_eq!(transport.request_count(), 2);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    pub fn push_response(&self, response: Response) {
        self.push(Scripted::Reply(Ok(response)));
    }

    /// Queue a fault.
    pub fn push_fault(&self, fault: TransportFault) {
        self.push(Scripted::Reply(Err(fault)));
    }

    /// Queue an outcome that is only delivered once the returned gate is
    /// released. Useful for keeping several calls in flight at once.
    #[must_use]
    pub fn push_gated(&self, outcome: Result<Response, TransportFault>) -> ReplyGate {
        let (release, gate) = oneshot::channel();
        self.push(Scripted::Gated(gate, outcome));
        ReplyGate(release)
    }

    /// Queue a call that never completes.
    pub fn push_hang(&self) {
        self.push(Scripted::Hang);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.state.lock().unwrap().requests.clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<RequestDescriptor> {
        self.state.lock().unwrap().requests.last().cloned()
    }

    /// Number of requests received.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn push(&self, scripted: Scripted) {
        self.state.lock().unwrap().script.push_back(scripted);
    }
}

impl Transport for MockTransport {
    fn send(
        &self,
        request: RequestDescriptor,
    ) -> impl Future<Output = Result<Response, TransportFault>> + Send {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            state.script.pop_front()
        };

        async move {
            match next {
                None => Ok(Response::ok()),
                Some(Scripted::Reply(outcome)) => outcome,
                Some(Scripted::Gated(gate, outcome)) => {
                    let _ = gate.await;
                    outcome
                }
                Some(Scripted::Hang) => futures::future::pending().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_script_in_order() {
        let transport = MockTransport::new();
        transport.push_fault(TransportFault::status(500, json!({ "msg": "boom" })));
        transport.push_response(Response::new(204));

        let first = transport.send(RequestDescriptor::get("/a")).await;
        let second = transport.send(RequestDescriptor::get("/b")).await;

        assert_eq!(
            first.err().and_then(|f| f.response).map(|r| r.status),
            Some(500)
        );
        assert_eq!(second.map(|r| r.status), Ok(204));
        assert_eq!(
            transport.last_request().map(|r| r.url),
            Some("/b".to_string())
        );
    }

    #[tokio::test]
    async fn test_hang_never_resolves() {
        let transport = MockTransport::new();
        transport.push_hang();

        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            transport.send(RequestDescriptor::get("/slow")),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_gated_reply_waits_for_release() {
        let transport = MockTransport::new();
        let gate = transport.push_gated(Ok(Response::new(202)));

        let mut pending = Box::pin(transport.send(RequestDescriptor::get("/queued")));
        assert!(futures::poll!(pending.as_mut()).is_pending());

        gate.release();
        assert_eq!(pending.await.map(|r| r.status), Ok(202));
    }
}
