//! Correlating responses with the requests that caused them.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use mungo_protocol::{
    Envelope, EvaluatorRequest, EvaluatorResponse, Fault, FaultKind, Identifier,
};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{MessengerError, Result};
use crate::transport::{ChannelTransport, Transport};

/// Configuration for a [`Messenger`].
#[derive(Debug, Clone)]
pub struct MessengerConfig {
    /// How long to wait for each response. `None` waits forever.
    pub request_timeout: Option<Duration>,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Default)]
struct Pending {
    waiters: HashMap<Identifier, oneshot::Sender<EvaluatorResponse>>,
    closed: bool,
}

/// The single request/response channel to the evaluator.
///
/// Every request is tagged with a fresh identifier and parked in a pending
/// table until an inbound envelope with the same identifier is
/// [delivered](Messenger::deliver). Any number of requests may be in flight
/// at once and responses may arrive in any order.
pub struct Messenger {
    transport: Box<dyn Transport>,
    pending: Mutex<Pending>,
    config: MessengerConfig,
}

/// Removes a pending entry when the waiting request finishes, whether it
/// was answered, timed out, failed to send, or was cancelled.
struct Registration<'a> {
    messenger: &'a Messenger,
    request_id: Identifier,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.messenger.lock().waiters.remove(&self.request_id);
    }
}

impl Messenger {
    /// Create a messenger over an arbitrary transport.
    ///
    /// Inbound envelopes must be fed to [`Messenger::deliver`] by the caller.
    pub fn new(transport: impl Transport + 'static, config: MessengerConfig) -> Self {
        Self {
            transport: Box::new(transport),
            pending: Mutex::new(Pending::default()),
            config,
        }
    }

    /// Create a messenger over a channel pair and spawn the task that pumps
    /// `inbound` into [`Messenger::deliver`].
    ///
    /// When `inbound` closes, every waiting request fails with
    /// [`MessengerError::ChannelClosed`]. Must be called from within a tokio
    /// runtime.
    pub fn connect(
        outbound: mpsc::Sender<String>,
        mut inbound: mpsc::Receiver<String>,
        config: MessengerConfig,
    ) -> Arc<Self> {
        let messenger = Arc::new(Self::new(ChannelTransport::new(outbound), config));
        let weak = Arc::downgrade(&messenger);

        tokio::spawn(async move {
            while let Some(text) = inbound.recv().await {
                let Some(messenger) = weak.upgrade() else {
                    break;
                };
                messenger.deliver(&text);
            }
            if let Some(messenger) = weak.upgrade() {
                messenger.close();
            }
            tracing::debug!("messenger inbound pump stopped");
        });

        messenger
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Fail all waiting requests and refuse new ones.
    pub fn close(&self) {
        let mut pending = self.lock();
        pending.closed = true;
        let dropped = pending.waiters.len();
        pending.waiters.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "messenger closed with requests in flight");
        }
    }

    /// Hand an inbound envelope to the request waiting for it.
    ///
    /// Envelopes that cannot be parsed, or whose identifier matches no
    /// waiting request, are dropped.
    pub fn deliver(&self, text: &str) {
        let envelope = match Envelope::<EvaluatorResponse>::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable response");
                return;
            }
        };

        let waiter = self.lock().waiters.remove(&envelope.request_id);
        match waiter {
            Some(tx) => {
                tracing::debug!(request_id = %envelope.request_id, "delivering response");
                // The requester may have given up in the meantime.
                let _ = tx.send(envelope.data);
            }
            None => {
                tracing::debug!(request_id = %envelope.request_id, "dropping unmatched response");
            }
        }
    }

    fn register(&self) -> Result<(Registration<'_>, oneshot::Receiver<EvaluatorResponse>)> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.lock();
        if pending.closed {
            return Err(MessengerError::ChannelClosed);
        }
        loop {
            let request_id = Identifier::generate();
            if let Entry::Vacant(slot) = pending.waiters.entry(request_id.clone()) {
                slot.insert(tx);
                let registration = Registration {
                    messenger: self,
                    request_id,
                };
                return Ok((registration, rx));
            }
        }
    }

    /// Send a request and wait for its response.
    pub async fn send_request(&self, request: EvaluatorRequest) -> Result<EvaluatorResponse> {
        let request_type = request.request_type();
        let (registration, rx) = self.register()?;
        let request_id = registration.request_id.clone();
        let text = Envelope::new(request_id.clone(), request).encode()?;

        tracing::debug!(%request_id, request_type, "sending request");
        self.transport.send(text).await?;

        let outcome = match self.config.request_timeout {
            None => rx.await,
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::warn!(%request_id, request_type, ?timeout, "request timed out");
                    return Err(MessengerError::Timeout {
                        request_id,
                        timeout,
                    });
                }
            },
        };
        drop(registration);
        outcome.map_err(|_| MessengerError::ChannelClosed)
    }

    async fn send_checked(&self, request: EvaluatorRequest) -> Result<EvaluatorResponse> {
        let response = self.send_request(request).await?;
        if response.success {
            return Ok(response);
        }
        let fault = response.error.unwrap_or_else(|| {
            Fault::new(FaultKind::Protocol, "unsuccessful response without an error")
        });
        tracing::warn!(kind = ?fault.kind, message = %fault.message, "evaluator rejected request");
        Err(MessengerError::Rejected(fault))
    }

    /// Install or replace a function in the evaluator.
    pub async fn install(
        &self,
        identifier: &Identifier,
        parameter_name: &str,
        function_body: &str,
    ) -> Result<()> {
        self.send_checked(EvaluatorRequest::Update {
            identifier: identifier.clone(),
            parameter_name: parameter_name.to_string(),
            function_body: function_body.to_string(),
        })
        .await
        .map(|_| ())
    }

    /// Remove a function from the evaluator.
    pub async fn remove(&self, identifier: &Identifier) -> Result<()> {
        self.send_checked(EvaluatorRequest::Delete {
            identifier: identifier.clone(),
        })
        .await
        .map(|_| ())
    }

    /// Apply a function to one datum.
    pub async fn query(&self, identifier: &Identifier, datum: Value) -> Result<Value> {
        self.send_checked(EvaluatorRequest::Query {
            identifier: identifier.clone(),
            datum,
        })
        .await
        .map(EvaluatorResponse::content)
    }

    /// Apply a function to every datum in one round trip.
    pub async fn mass_query(&self, identifier: &Identifier, data: Vec<Value>) -> Result<Vec<Value>> {
        let expected = data.len();
        let content = self
            .send_checked(EvaluatorRequest::MassQuery {
                identifier: identifier.clone(),
                data,
            })
            .await?
            .content();
        match content {
            Value::Array(results) if results.len() == expected => Ok(results),
            Value::Array(results) => Err(MessengerError::MalformedResponse(format!(
                "expected {} results, got {}",
                expected,
                results.len()
            ))),
            other => Err(MessengerError::MalformedResponse(format!(
                "expected an array of results, got {}",
                other
            ))),
        }
    }
}

impl std::fmt::Debug for Messenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messenger")
            .field("pending", &self.pending_count())
            .field("config", &self.config)
            .finish()
    }
}
