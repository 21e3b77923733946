//! The dataset abstraction shared by every variant.
//!
//! A dataset sits in two independent structures at once:
//!
//! - **Containment**: a tree. Each dataset has at most one parent and an
//!   ordered list of children. Parents own their children.
//! - **Dependency**: a DAG. Predecessors are the datasets this one reads
//!   from; successors are the datasets reading from it. `updated()` flows
//!   along successor edges. Edges are weak in both directions.
//!
//! The two never imply each other. Use [`crate::set_parent`] for the first
//! and [`crate::create_dependency`] for the second.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::accumulator::Accumulator;
use crate::error::Result;

/// Shared handle to any dataset.
pub type DatasetRef = Arc<dyn Dataset>;

/// Process-unique identity of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(Uuid);

impl DatasetId {
    /// Create a new random DatasetId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A weak link to another dataset, remembering who it pointed at.
#[derive(Clone)]
pub(crate) struct Edge {
    pub(crate) id: DatasetId,
    pub(crate) target: Weak<dyn Dataset>,
}

impl Edge {
    pub(crate) fn to(dataset: &dyn Dataset) -> Self {
        Self {
            id: dataset.id(),
            target: dataset.core().this.clone(),
        }
    }
}

#[derive(Default)]
pub(crate) struct Links {
    pub(crate) parent: Option<Edge>,
    pub(crate) children: Vec<DatasetRef>,
    pub(crate) predecessors: Vec<Edge>,
    pub(crate) successors: Vec<Edge>,
}

/// State every dataset carries: identity, name, and graph links.
pub struct DatasetCore {
    id: DatasetId,
    name: String,
    this: Weak<dyn Dataset>,
    links: Mutex<Links>,
}

impl DatasetCore {
    /// `this` must point at the dataset that owns this core; build the
    /// dataset with [`Arc::new_cyclic`] to obtain it.
    pub fn new(name: impl Into<String>, this: Weak<dyn Dataset>) -> Self {
        Self {
            id: DatasetId::new(),
            name: name.into(),
            this,
            links: Mutex::new(Links::default()),
        }
    }

    pub(crate) fn links(&self) -> MutexGuard<'_, Links> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A strong handle to the owning dataset, if it is still alive.
    pub(crate) fn upgrade(&self) -> Option<DatasetRef> {
        self.this.upgrade()
    }
}

impl std::fmt::Debug for DatasetCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

fn live(edges: &[Edge]) -> Vec<DatasetRef> {
    edges.iter().filter_map(|e| e.target.upgrade()).collect()
}

/// A named, lazily readable sequence of JSON records.
///
/// Implementors provide storage or derivation ([`get_item`],
/// [`count_direct_items`]) and their reaction to change
/// ([`predecessor_updated`], [`self_updated`]). Everything else is built on
/// top of those.
///
/// [`get_item`]: Dataset::get_item
/// [`count_direct_items`]: Dataset::count_direct_items
/// [`predecessor_updated`]: Dataset::predecessor_updated
/// [`self_updated`]: Dataset::self_updated
#[async_trait]
pub trait Dataset: Send + Sync {
    fn core(&self) -> &DatasetCore;

    /// The direct item at `index`.
    ///
    /// Fails with [`crate::DatasetError::OutOfRange`] past the last direct
    /// item.
    async fn get_item(&self, index: usize) -> Result<Value>;

    /// Number of direct items, excluding children.
    async fn count_direct_items(&self) -> Result<usize>;

    /// Called when the predecessor `predecessor` has changed.
    fn predecessor_updated(&self, predecessor: DatasetId);

    /// Called when this dataset itself has changed.
    fn self_updated(&self);

    fn id(&self) -> DatasetId {
        self.core().id
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn parent(&self) -> Option<DatasetRef> {
        self.core()
            .links()
            .parent
            .as_ref()
            .and_then(|e| e.target.upgrade())
    }

    /// Depth in the containment tree; roots are generation 0.
    fn generation(&self) -> usize {
        match self.parent() {
            None => 0,
            Some(parent) => 1 + parent.generation(),
        }
    }

    fn children(&self) -> Vec<DatasetRef> {
        self.core().links().children.clone()
    }

    fn predecessors(&self) -> Vec<DatasetRef> {
        live(&self.core().links().predecessors)
    }

    fn successors(&self) -> Vec<DatasetRef> {
        live(&self.core().links().successors)
    }

    /// Announce a change: react locally, then notify every successor.
    fn updated(&self) {
        self.self_updated();
        let id = self.id();
        for successor in self.successors() {
            successor.predecessor_updated(id);
        }
    }

    /// All direct items in index order.
    async fn get_direct_items(&self) -> Result<Vec<Value>> {
        let count = self.count_direct_items().await?;
        Accumulator::new((0..count).map(|i| self.get_item(i)))
            .await
            .into_iter()
            .collect()
    }

    /// Direct items plus those of every descendant.
    async fn count_items(&self) -> Result<usize> {
        let children = self.children();
        let counts = std::iter::once(self.count_direct_items())
            .chain(children.iter().map(|child| child.count_items()));
        Accumulator::new(counts)
            .await
            .into_iter()
            .try_fold(0, |total, count| Ok(total + count?))
    }

    /// Direct items, then (if asked) each child's items depth-first, left
    /// to right.
    async fn get_items(&self, include_children: bool) -> Result<Vec<Value>> {
        let mut items = self.get_direct_items().await?;
        if !include_children {
            return Ok(items);
        }
        let children = self.children();
        let nested = Accumulator::new(children.iter().map(|child| child.get_items(true))).await;
        for child_items in nested {
            items.extend(child_items?);
        }
        Ok(items)
    }
}

impl std::fmt::Debug for dyn Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
