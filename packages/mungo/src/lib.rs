//! # mungo
//!
//! Compose record datasets as a graph of lazy transforms whose user code
//! runs in an isolated evaluator.
//!
//! This crate re-exports the workspace crates and adds [`Engine`], which
//! starts an evaluator and the messenger connected to it in one step.
//!
//! ```rust
//! use mungo::datasets::{Dataset, DatasetRef, FunctionSource, LiteralDataset, MappedDataset};
//! use mungo::{Engine, EngineConfig};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::start(EngineConfig::default())?;
//! let rows: DatasetRef = LiteralDataset::new("rows", vec![json!({"x": 1}), json!({"x": 2})]);
//! let doubled = MappedDataset::new(
//!     "doubled",
//!     rows,
//!     FunctionSource::inline("row", "return row.x * 2;"),
//!     engine.messenger(),
//! )
//! .await?;
//! assert_eq!(doubled.get_items(false).await?, vec![json!(2), json!(4)]);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

pub use mungo_datasets as datasets;
pub use mungo_messenger as messenger;
pub use mungo_protocol as protocol;
pub use mungo_sandbox as sandbox;

use mungo_messenger::{Messenger, MessengerConfig};
use mungo_sandbox::{spawn_isolate, SandboxConfig};
use tokio::sync::oneshot;

/// Configuration for an [`Engine`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub sandbox: SandboxConfig,
    pub messenger: MessengerConfig,
}

/// An isolated evaluator and the messenger that reaches it.
#[derive(Debug)]
pub struct Engine {
    messenger: Arc<Messenger>,
    stop: oneshot::Sender<()>,
}

impl Engine {
    /// Start the evaluator thread and connect a messenger to it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: EngineConfig) -> mungo_sandbox::Result<Self> {
        let handle = spawn_isolate(config.sandbox)?;
        let messenger = Messenger::connect(handle.requests, handle.responses, config.messenger);
        tracing::debug!("engine started");
        Ok(Self {
            messenger,
            stop: handle.stop,
        })
    }

    /// The messenger to hand to derived datasets.
    pub fn messenger(&self) -> Arc<Messenger> {
        self.messenger.clone()
    }

    /// Stop the evaluator. Requests still waiting fail, and so do later ones.
    pub fn shutdown(self) {
        self.messenger.close();
        // The isolate is already gone if this fails.
        let _ = self.stop.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mungo_datasets::{Dataset, DatasetRef, FilteredDataset, FunctionSource, LiteralDataset};
    use serde_json::json;

    #[tokio::test]
    async fn engine_serves_datasets() {
        let engine = Engine::start(EngineConfig::default()).unwrap();
        let rows: DatasetRef = LiteralDataset::new("rows", vec![json!(1), json!(2), json!(3)]);
        let odd = FilteredDataset::new(
            "odd",
            rows,
            FunctionSource::inline("n", "return n % 2 == 1;"),
            engine.messenger(),
        )
        .await
        .unwrap();
        assert_eq!(odd.get_items(false).await.unwrap(), vec![json!(1), json!(3)]);
    }

    #[tokio::test]
    async fn shutdown_fails_later_requests() {
        let engine = Engine::start(EngineConfig::default()).unwrap();
        let messenger = engine.messenger();
        engine.shutdown();
        let id = mungo_protocol::Identifier::generate();
        assert!(messenger.install(&id, "x", "return x;").await.is_err());
    }
}
