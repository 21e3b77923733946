//! Hosting an evaluator on its own thread.

use std::thread;

use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::evaluator::{Evaluator, SandboxConfig};

/// The outside of a running isolate: the only way to reach its functions.
///
/// Dropping `requests` (or every clone of it) stops the isolate once the
/// envelopes already queued have been answered. Sending on `stop` stops it
/// without waiting.
#[derive(Debug)]
pub struct IsolateHandle {
    /// Serialized request envelopes into the isolate.
    pub requests: mpsc::Sender<String>,
    /// Serialized response envelopes out of the isolate.
    pub responses: mpsc::Receiver<String>,
    /// Stops the isolate when sent to. Dropping it does nothing.
    pub stop: oneshot::Sender<()>,
    /// The isolate thread.
    pub thread: thread::JoinHandle<()>,
}

impl IsolateHandle {
    /// Split into the channel pair, detaching the thread.
    pub fn into_channels(self) -> (mpsc::Sender<String>, mpsc::Receiver<String>) {
        (self.requests, self.responses)
    }
}

/// Start an evaluator on a new thread with its own single-threaded runtime.
///
/// The JavaScript realm never leaves that thread.
pub fn spawn_isolate(config: SandboxConfig) -> Result<IsolateHandle> {
    let (request_tx, mut request_rx) = mpsc::channel::<String>(config.channel_capacity);
    let (response_tx, response_rx) = mpsc::channel::<String>(config.channel_capacity);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;

    let thread = thread::Builder::new()
        .name("mungo-isolate".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                let mut evaluator = match Evaluator::new(&config) {
                    Ok(evaluator) => evaluator,
                    Err(e) => {
                        tracing::error!(error = %e, "isolate failed to start");
                        return;
                    }
                };
                // A dropped stop handle means the isolate runs until its
                // requests close.
                let stop = async move {
                    if stop_rx.await.is_err() {
                        std::future::pending::<()>().await;
                    }
                };
                tokio::pin!(stop);
                loop {
                    tokio::select! {
                        request = request_rx.recv() => {
                            let Some(text) = request else {
                                break;
                            };
                            let Some(reply) = evaluator.handle_envelope(&text) else {
                                continue;
                            };
                            if response_tx.send(reply).await.is_err() {
                                break;
                            }
                        }
                        _ = &mut stop => {
                            tracing::debug!("isolate asked to stop");
                            break;
                        }
                    }
                }
                tracing::debug!(functions = evaluator.len(), "isolate stopped");
            });
        })?;

    Ok(IsolateHandle {
        requests: request_tx,
        responses: response_rx,
        stop: stop_tx,
        thread,
    })
}
