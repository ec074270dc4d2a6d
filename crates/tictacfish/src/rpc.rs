//! Remote call protocol: correlation of requests and responses on one link.
//!
//! A [`PeerLink`] is the local end of one connection. Requests register a
//! pending entry keyed by a fresh [`CallId`] before the envelope is queued,
//! then wait for the matching response, the connection to drop, or the call
//! timeout. A response arriving after its timeout finds no pending entry and
//! is dropped.

use crate::envelope::{CallId, Envelope, EnvelopeKind, Method};
use crate::error::ActorError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tictacfish_game::{ActorIdentity, PeerId};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, instrument, trace, warn};

type PendingReply = oneshot::Sender<Result<Value, ActorError>>;

/// Receives requests and notifications arriving on a link.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    /// Executes an inbound request or one-way envelope.
    ///
    /// The returned value (or error) is sent back for requests and discarded
    /// for one-way envelopes.
    async fn handle(&self, link: Arc<PeerLink>, envelope: Envelope) -> Result<Value, ActorError>;

    /// Called once a link's connection has closed.
    fn connection_lost(&self, peer: PeerId);
}

/// Local end of one connection to a peer.
#[derive(Debug)]
pub struct PeerLink {
    peer: PeerId,
    outbound: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
    pending: Mutex<HashMap<CallId, PendingReply>>,
    next_call: AtomicU64,
    call_timeout: Duration,
    max_frame_bytes: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PeerLink {
    /// Creates a link and the queue its writer task drains.
    ///
    /// Envelopes that would encode to more than `max_frame_bytes` are refused
    /// by the link instead of reaching the writer.
    pub fn new(
        peer: PeerId,
        call_timeout: Duration,
        max_frame_bytes: usize,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Arc::new(Self {
            peer,
            outbound: Mutex::new(Some(tx)),
            pending: Mutex::new(HashMap::new()),
            next_call: AtomicU64::new(1),
            call_timeout,
            max_frame_bytes,
        });
        (link, rx)
    }

    /// The peer this link talks to.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// Whether the link has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.outbound).is_none()
    }

    /// Number of requests still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        lock(&self.pending).len()
    }

    fn next_call_id(&self) -> CallId {
        CallId(self.next_call.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, envelope: Envelope) -> Result<(), ActorError> {
        let size = envelope.encode()?.len();
        if size > self.max_frame_bytes {
            return Err(ActorError::protocol(format!(
                "{} envelope of {size} bytes exceeds the {} byte frame limit",
                envelope.method, self.max_frame_bytes
            )));
        }
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx.send(envelope).map_err(|_| ActorError::ConnectionLost(self.peer)),
            None => Err(ActorError::ConnectionLost(self.peer)),
        }
    }

    /// Invokes `method` on `target` and waits for the response.
    ///
    /// # Errors
    ///
    /// The remote failure, [`ActorError::Timeout`] after the configured bound,
    /// [`ActorError::Protocol`] if the request is too large to frame, or
    /// [`ActorError::ConnectionLost`].
    #[instrument(skip(self, arguments), fields(peer = %self.peer, target = %target.short()))]
    pub async fn call(
        &self,
        target: ActorIdentity,
        method: Method,
        arguments: Value,
    ) -> Result<Value, ActorError> {
        let call_id = self.next_call_id();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(call_id, tx);

        if let Err(e) = self.send(Envelope::request(target, call_id, method, arguments)) {
            lock(&self.pending).remove(&call_id);
            return Err(e);
        }
        debug!(%call_id, %method, "Request sent");

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ActorError::ConnectionLost(self.peer)),
            Err(_) => {
                lock(&self.pending).remove(&call_id);
                warn!(%call_id, %method, "Call timed out");
                Err(ActorError::Timeout {
                    method: method.to_string(),
                    after_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    /// Sends a one-way envelope; no reply is expected.
    #[instrument(skip(self, arguments), fields(peer = %self.peer, target = %target.short()))]
    pub fn notify(&self, target: ActorIdentity, method: Method, arguments: Value) -> Result<(), ActorError> {
        let call_id = self.next_call_id();
        trace!(%call_id, %method, "One-way sent");
        self.send(Envelope::one_way(target, call_id, method, arguments))
    }

    /// Completes the pending call a response envelope answers.
    pub fn complete(&self, response: Envelope) {
        let call_id = response.call_id;
        match lock(&self.pending).remove(&call_id) {
            Some(tx) => {
                let _ = tx.send(response.into_outcome());
            }
            None => debug!(%call_id, peer = %self.peer, "Dropping late or unknown response"),
        }
    }

    /// Closes the link and fails every outstanding call with `ConnectionLost`.
    #[instrument(skip(self), fields(peer = %self.peer))]
    pub fn close(&self) {
        lock(&self.outbound).take();
        let pending: Vec<_> = lock(&self.pending).drain().collect();
        if !pending.is_empty() {
            debug!(count = pending.len(), "Failing outstanding calls");
        }
        for (_, tx) in pending {
            let _ = tx.send(Err(ActorError::ConnectionLost(self.peer)));
        }
    }
}

/// Routes one inbound envelope: responses complete calls, everything else goes
/// to the handler on its own task.
pub fn route(handler: Arc<dyn InboundHandler>, link: Arc<PeerLink>, envelope: Envelope) {
    match envelope.kind {
        EnvelopeKind::Response => link.complete(envelope),
        EnvelopeKind::Request => {
            tokio::spawn(async move {
                let outcome = handler.handle(link.clone(), envelope.clone()).await;
                let sent = match envelope.respond(&outcome).and_then(|response| link.send(response)) {
                    Err(ActorError::Protocol { reason }) => envelope
                        .respond(&Err(ActorError::protocol(reason)))
                        .and_then(|response| link.send(response)),
                    sent => sent,
                };
                if let Err(e) = sent {
                    warn!(call_id = %envelope.call_id, error = %e, "Failed to send response");
                }
            });
        }
        EnvelopeKind::OneWay => {
            tokio::spawn(async move {
                let method = envelope.method;
                if let Err(e) = handler.handle(link, envelope).await {
                    warn!(%method, error = %e, "One-way call failed");
                }
            });
        }
    }
}
