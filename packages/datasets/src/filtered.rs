//! Datasets holding the source items that satisfy a predicate.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use mungo_messenger::Messenger;
use mungo_protocol::Identifier;
use serde_json::Value;

use crate::dataset::{Dataset, DatasetCore, DatasetId, DatasetRef};
use crate::error::{DatasetError, Result};
use crate::function::{FunctionSource, SandboxedFunction};
use crate::graph::{create_dependency, remove_dependency, set_parent};
use crate::mapped::RecursionDepth;

/// How many more included items a scan should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Scan to the end of the source.
    All,
    /// Stop after finding this many more.
    Exactly(usize),
}

/// How far the scan has got through the source.
#[derive(Debug, Default)]
struct Cursor {
    included_indices: Vec<usize>,
    next_index: usize,
    /// Bumped on every reset so a suspended scan can tell its progress is
    /// stale.
    epoch: u64,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    AtLeast(usize),
    All,
}

/// A lazily evaluated subset of a source.
///
/// Source positions are tested in order, once each, and only as far as a
/// read needs. The positions that passed are remembered until the source
/// or the predicate changes.
#[derive(Debug)]
pub struct FilteredDataset {
    core: DatasetCore,
    source: Mutex<DatasetRef>,
    predicate: SandboxedFunction,
    cursor: Mutex<Cursor>,
    scan_gate: tokio::sync::Mutex<()>,
}

impl FilteredDataset {
    /// Filter `source` by `predicate`, installing it first if it is inline.
    pub async fn new(
        name: impl Into<String>,
        source: DatasetRef,
        predicate: FunctionSource,
        messenger: Arc<Messenger>,
    ) -> Result<Arc<Self>> {
        let predicate = SandboxedFunction::bind(predicate, messenger).await?;
        Self::with_predicate(name, source, predicate)
    }

    /// Filter `source` by a predicate that is already installed.
    pub fn with_predicate(
        name: impl Into<String>,
        source: DatasetRef,
        predicate: SandboxedFunction,
    ) -> Result<Arc<Self>> {
        let name = name.into();
        let filtered = Arc::new_cyclic(|this: &Weak<Self>| Self {
            core: DatasetCore::new(name, this.clone() as Weak<dyn Dataset>),
            source: Mutex::new(source.clone()),
            predicate,
            cursor: Mutex::new(Cursor::default()),
            scan_gate: tokio::sync::Mutex::new(()),
        });
        create_dependency(&*source, &*filtered)?;
        Ok(filtered)
    }

    fn source_slot(&self) -> MutexGuard<'_, DatasetRef> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cursor(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn source(&self) -> DatasetRef {
        self.source_slot().clone()
    }

    pub fn predicate_id(&self) -> &Identifier {
        self.predicate.identifier()
    }

    /// Source positions known to pass the predicate, in order.
    pub fn included_indices(&self) -> Vec<usize> {
        self.cursor().included_indices.clone()
    }

    /// The first source position not yet tested.
    pub fn next_index(&self) -> usize {
        self.cursor().next_index
    }

    fn reset(&self) {
        let mut cursor = self.cursor();
        cursor.included_indices.clear();
        cursor.next_index = 0;
        cursor.epoch += 1;
    }

    /// Test further source positions until `quantity` more have passed or
    /// the source is exhausted.
    pub async fn find_included_indices(&self, quantity: Quantity) -> Result<()> {
        let _gate = self.scan_gate.lock().await;
        let target = match quantity {
            Quantity::All => Target::All,
            Quantity::Exactly(0) => return Ok(()),
            Quantity::Exactly(n) => Target::AtLeast(self.cursor().included_indices.len() + n),
        };
        self.scan(target).await
    }

    /// Caller must hold `scan_gate`.
    async fn scan(&self, target: Target) -> Result<()> {
        loop {
            let (next_index, epoch) = {
                let cursor = self.cursor();
                if let Target::AtLeast(n) = target {
                    if cursor.included_indices.len() >= n {
                        return Ok(());
                    }
                }
                (cursor.next_index, cursor.epoch)
            };

            let source = self.source();
            if next_index >= source.count_direct_items().await? {
                return Ok(());
            }
            let item = source.get_item(next_index).await?;
            let verdict = self.predicate.query(item).await?;
            let included = verdict == Value::Bool(true);

            if !self.record(epoch, next_index, included) {
                tracing::debug!(dataset = %self.name(), "reset during scan, restarting");
            }
        }
    }

    /// Commit one tested position, unless the cursor was reset since `epoch`.
    fn record(&self, epoch: u64, index: usize, included: bool) -> bool {
        let mut cursor = self.cursor();
        if cursor.epoch != epoch {
            return false;
        }
        cursor.next_index = index + 1;
        if included {
            cursor.included_indices.push(index);
        }
        tracing::trace!(dataset = %self.name(), index, included, "scanned");
        true
    }

    /// Make sure at least `n` included positions are known.
    async fn ensure(&self, n: usize) -> Result<Vec<usize>> {
        {
            let cursor = self.cursor();
            if cursor.included_indices.len() >= n {
                return Ok(cursor.included_indices.clone());
            }
        }
        let _gate = self.scan_gate.lock().await;
        self.scan(Target::AtLeast(n)).await?;
        Ok(self.included_indices())
    }

    /// Read from `source` instead, then notify successors.
    pub fn set_source(&self, source: DatasetRef) -> Result<()> {
        let old = self.source();
        if old.id() == source.id() {
            return Ok(());
        }
        remove_dependency(&*old, self)?;
        if let Err(e) = create_dependency(&*source, self) {
            create_dependency(&*old, self)?;
            return Err(e);
        }
        *self.source_slot() = source;
        self.updated();
        Ok(())
    }

    /// Replace the predicate body, then notify successors.
    pub async fn set_predicate(&self, parameter_name: &str, body: &str) -> Result<()> {
        self.predicate.update(parameter_name, body).await?;
        self.updated();
        Ok(())
    }

    /// Delete the predicate from the evaluator.
    pub async fn release(&self) -> Result<()> {
        self.predicate.release().await
    }
}

#[async_trait]
impl Dataset for FilteredDataset {
    fn core(&self) -> &DatasetCore {
        &self.core
    }

    async fn get_item(&self, index: usize) -> Result<Value> {
        let Some(wanted) = index.checked_add(1) else {
            return Err(DatasetError::OutOfRange {
                index,
                len: self.count_direct_items().await?,
            });
        };
        let included = self.ensure(wanted).await?;
        let Some(&position) = included.get(index) else {
            return Err(DatasetError::OutOfRange {
                index,
                len: included.len(),
            });
        };
        self.source().get_item(position).await
    }

    async fn count_direct_items(&self) -> Result<usize> {
        let _gate = self.scan_gate.lock().await;
        self.scan(Target::All).await?;
        Ok(self.cursor().included_indices.len())
    }

    fn predecessor_updated(&self, predecessor: DatasetId) {
        if predecessor == self.source().id() {
            self.updated();
        }
    }

    fn self_updated(&self) {
        self.reset();
    }
}

/// Filter `source` (not its children) by `predicate`.
pub async fn filtered_dataset(
    name: &str,
    parent: Option<&dyn Dataset>,
    source: DatasetRef,
    predicate: FunctionSource,
    messenger: Arc<Messenger>,
) -> Result<Arc<FilteredDataset>> {
    recursively_filtered_dataset(
        name,
        parent,
        source,
        predicate,
        RecursionDepth::Levels(0),
        messenger,
    )
    .await
}

/// Filter `source` and its children down to `depth`.
///
/// An inline predicate is installed separately for every level, so each
/// derived dataset owns its own identifier. Each derived child is named
/// `<name>-filtered-<child>` and is contained by the derived dataset one
/// level up.
pub async fn recursively_filtered_dataset(
    name: &str,
    parent: Option<&dyn Dataset>,
    source: DatasetRef,
    predicate: FunctionSource,
    depth: RecursionDepth,
    messenger: Arc<Messenger>,
) -> Result<Arc<FilteredDataset>> {
    let top = filter_tree(name.to_string(), source, predicate, depth, messenger).await?;
    if let Some(parent) = parent {
        set_parent(&*top, Some(parent))?;
    }
    Ok(top)
}

fn filter_tree(
    name: String,
    source: DatasetRef,
    predicate: FunctionSource,
    depth: RecursionDepth,
    messenger: Arc<Messenger>,
) -> Pin<Box<dyn Future<Output = Result<Arc<FilteredDataset>>> + Send>> {
    Box::pin(async move {
        let mut derived_children = Vec::new();
        if let Some(next) = depth.descend() {
            for child in source.children() {
                let child_name = format!("{}-filtered-{}", name, child.name());
                derived_children.push(
                    filter_tree(child_name, child, predicate.clone(), next, messenger.clone())
                        .await?,
                );
            }
        }

        let node = FilteredDataset::new(name, source, predicate, messenger).await?;
        for child in derived_children {
            set_parent(&*child, Some(&*node))?;
        }
        Ok(node)
    })
}
