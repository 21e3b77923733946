//! Mungo Datasets: a lazy graph of record datasets.
//!
//! Datasets hold or derive sequences of JSON records. Derived datasets pull
//! from their source only when read, and run user functions through a
//! [`mungo_messenger::Messenger`] so that no user code ever executes in the
//! graph itself.
//!
//! - [`LiteralDataset`]: items held directly
//! - [`MappedDataset`]: one output item per source item
//! - [`FilteredDataset`]: the source items passing a predicate
//!
//! Changes propagate with [`Dataset::updated`]; derived datasets drop what
//! they cached and recompute on the next read.
//!
//! ```rust,no_run
//! use mungo_datasets::{Dataset, DatasetRef, FilteredDataset, FunctionSource, LiteralDataset};
//! use mungo_messenger::{Messenger, MessengerConfig};
//! use mungo_sandbox::{spawn_isolate, SandboxConfig};
//! use serde_json::json;
//!
//! # async fn example() -> mungo_datasets::Result<()> {
//! let (requests, responses) = spawn_isolate(SandboxConfig::default()).unwrap().into_channels();
//! let messenger = Messenger::connect(requests, responses, MessengerConfig::default());
//!
//! let rows: DatasetRef = LiteralDataset::new("rows", vec![json!({"y": 0}), json!({"y": 3})]);
//! let positive = FilteredDataset::new(
//!     "positive",
//!     rows,
//!     FunctionSource::inline("row", "return row.y > 0;"),
//!     messenger,
//! )
//! .await?;
//! assert_eq!(positive.count_direct_items().await?, 1);
//! # Ok(())
//! # }
//! ```

mod accumulator;
mod dataset;
mod error;
mod filtered;
mod function;
mod graph;
mod literal;
mod mapped;

pub use accumulator::{Accumulator, BoxFuture};
pub use dataset::{Dataset, DatasetCore, DatasetId, DatasetRef};
pub use error::{DatasetError, Result};
pub use filtered::{filtered_dataset, recursively_filtered_dataset, FilteredDataset, Quantity};
pub use function::{FunctionSource, SandboxedFunction};
pub use graph::{create_dependency, remove_dependency, remove_parent, set_parent};
pub use literal::LiteralDataset;
pub use mapped::{mapped_dataset, recursively_mapped_dataset, MappedDataset, RecursionDepth};
