//! Shared fixtures: an isolate behind a messenger that counts what it sends.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use mungo_datasets::{DatasetRef, LiteralDataset};
use mungo_messenger::{ChannelTransport, Messenger, MessengerConfig, Transport};
use mungo_protocol::{Envelope, EvaluatorRequest};
use mungo_sandbox::{spawn_isolate, SandboxConfig};
use serde_json::Value;

#[derive(Default)]
pub struct Counts {
    pub queries: AtomicUsize,
    pub mass_queries: AtomicUsize,
    pub installs: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl Counts {
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn mass_queries(&self) -> usize {
        self.mass_queries.load(Ordering::SeqCst)
    }

    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

struct Counting {
    inner: ChannelTransport,
    counts: Arc<Counts>,
}

#[async_trait]
impl Transport for Counting {
    async fn send(&self, envelope: String) -> mungo_messenger::Result<()> {
        if let Ok(parsed) = Envelope::<EvaluatorRequest>::decode(&envelope) {
            let counter = match parsed.data {
                EvaluatorRequest::Query { .. } => &self.counts.queries,
                EvaluatorRequest::MassQuery { .. } => &self.counts.mass_queries,
                EvaluatorRequest::Create { .. } | EvaluatorRequest::Update { .. } => {
                    &self.counts.installs
                }
                EvaluatorRequest::Delete { .. } => &self.counts.deletes,
            };
            counter.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.send(envelope).await
    }
}

/// A messenger wired to a fresh isolate.
pub fn messenger() -> Arc<Messenger> {
    counting_messenger().0
}

/// A messenger wired to a fresh isolate, plus counters of the requests it
/// has sent.
pub fn counting_messenger() -> (Arc<Messenger>, Arc<Counts>) {
    let (requests, mut responses) = spawn_isolate(SandboxConfig::default()).unwrap().into_channels();
    let counts = Arc::new(Counts::default());
    let messenger = Arc::new(Messenger::new(
        Counting {
            inner: ChannelTransport::new(requests),
            counts: counts.clone(),
        },
        MessengerConfig::default(),
    ));

    let pump = Arc::downgrade(&messenger);
    tokio::spawn(async move {
        while let Some(text) = responses.recv().await {
            match pump.upgrade() {
                Some(messenger) => messenger.deliver(&text),
                None => break,
            }
        }
    });

    (messenger, counts)
}

pub fn literal(name: &str, items: Vec<Value>) -> Arc<LiteralDataset> {
    LiteralDataset::new(name, items)
}

pub fn as_ref<T: mungo_datasets::Dataset + 'static>(dataset: &Arc<T>) -> DatasetRef {
    dataset.clone()
}
