//! Outbound side of the evaluator boundary.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{MessengerError, Result};

/// Something that can carry a serialized envelope to the evaluator.
///
/// Responses come back separately, through [`crate::Messenger::deliver`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand one serialized envelope to the other side.
    async fn send(&self, envelope: String) -> Result<()>;
}

/// A [`Transport`] over a tokio mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, envelope: String) -> Result<()> {
        self.tx
            .send(envelope)
            .await
            .map_err(|_| MessengerError::ChannelClosed)
    }
}
