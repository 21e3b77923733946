//! Datasets whose items are a function of a source's items.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use mungo_messenger::Messenger;
use mungo_protocol::Identifier;
use serde_json::Value;

use crate::dataset::{Dataset, DatasetCore, DatasetId, DatasetRef};
use crate::error::Result;
use crate::function::{FunctionSource, SandboxedFunction};
use crate::graph::{create_dependency, remove_dependency, set_parent};

/// How far below the top level a recursive helper descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionDepth {
    /// Derive this many levels of children; `Levels(0)` is the top only.
    Levels(usize),
    /// Derive every descendant.
    Unbounded,
}

impl RecursionDepth {
    pub(crate) fn descend(self) -> Option<Self> {
        match self {
            RecursionDepth::Levels(0) => None,
            RecursionDepth::Levels(n) => Some(RecursionDepth::Levels(n - 1)),
            RecursionDepth::Unbounded => Some(RecursionDepth::Unbounded),
        }
    }
}

/// Negative depths mean unbounded.
impl From<i64> for RecursionDepth {
    fn from(depth: i64) -> Self {
        usize::try_from(depth)
            .map(RecursionDepth::Levels)
            .unwrap_or(RecursionDepth::Unbounded)
    }
}

/// Item `i` is `function(source.get_item(i))`.
#[derive(Debug)]
pub struct MappedDataset {
    core: DatasetCore,
    source: Mutex<DatasetRef>,
    function: SandboxedFunction,
}

impl MappedDataset {
    /// Map `source` through `function`, installing it first if it is inline.
    pub async fn new(
        name: impl Into<String>,
        source: DatasetRef,
        function: FunctionSource,
        messenger: Arc<Messenger>,
    ) -> Result<Arc<Self>> {
        let function = SandboxedFunction::bind(function, messenger).await?;
        Self::with_function(name, source, function)
    }

    /// Map `source` through a function that is already installed.
    pub fn with_function(
        name: impl Into<String>,
        source: DatasetRef,
        function: SandboxedFunction,
    ) -> Result<Arc<Self>> {
        let name = name.into();
        let mapped = Arc::new_cyclic(|this: &Weak<Self>| Self {
            core: DatasetCore::new(name, this.clone() as Weak<dyn Dataset>),
            source: Mutex::new(source.clone()),
            function,
        });
        create_dependency(&*source, &*mapped)?;
        Ok(mapped)
    }

    fn source_slot(&self) -> MutexGuard<'_, DatasetRef> {
        self.source.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn source(&self) -> DatasetRef {
        self.source_slot().clone()
    }

    pub fn function_id(&self) -> &Identifier {
        self.function.identifier()
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

    /// Replace the function body, then notify successors.
    pub async fn set_function(&self, parameter_name: &str, body: &str) -> Result<()> {
        self.function.update(parameter_name, body).await?;
        self.updated();
        Ok(())
    }

    /// Delete the function from the evaluator.
    ///
    /// Datasets sharing the identifier (such as recursively mapped children)
    /// lose it too.
    pub async fn release(&self) -> Result<()> {
        self.function.release().await
    }
}

#[async_trait]
impl Dataset for MappedDataset {
    fn core(&self) -> &DatasetCore {
        &self.core
    }

    async fn get_item(&self, index: usize) -> Result<Value> {
        let item = self.source().get_item(index).await?;
        self.function.query(item).await
    }

    async fn count_direct_items(&self) -> Result<usize> {
        self.source().count_direct_items().await
    }

    /// One evaluator round trip for the whole batch.
    async fn get_direct_items(&self) -> Result<Vec<Value>> {
        let items = self.source().get_direct_items().await?;
        self.function.mass_query(items).await
    }

    fn predecessor_updated(&self, _predecessor: DatasetId) {
        self.updated();
    }

    fn self_updated(&self) {}
}

/// Map `source` (not its children) through `function`.
pub async fn mapped_dataset(
    name: &str,
    parent: Option<&dyn Dataset>,
    source: DatasetRef,
    function: FunctionSource,
    messenger: Arc<Messenger>,
) -> Result<Arc<MappedDataset>> {
    recursively_mapped_dataset(
        name,
        parent,
        source,
        function,
        RecursionDepth::Levels(0),
        messenger,
    )
    .await
}

/// Map `source` and its children down to `depth`.
///
/// Every level shares one installed function. Each derived child is named
/// `<name>-mapped-<child>`, is contained by the derived dataset one level up,
/// and depends on the top-level derived dataset so that replacing the shared
/// function reaches it.
pub async fn recursively_mapped_dataset(
    name: &str,
    parent: Option<&dyn Dataset>,
    source: DatasetRef,
    function: FunctionSource,
    depth: RecursionDepth,
    messenger: Arc<Messenger>,
) -> Result<Arc<MappedDataset>> {
    let function = SandboxedFunction::bind(function, messenger).await?;
    let top = map_tree(name, source, &function, depth, None)?;
    if let Some(parent) = parent {
        set_parent(&*top, Some(parent))?;
    }
    Ok(top)
}

fn map_tree(
    name: &str,
    source: DatasetRef,
    function: &SandboxedFunction,
    depth: RecursionDepth,
    top: Option<&MappedDataset>,
) -> Result<Arc<MappedDataset>> {
    let node = MappedDataset::with_function(name, source.clone(), function.clone())?;
    let top = top.unwrap_or(&*node);
    if let Some(next) = depth.descend() {
        for child in source.children() {
            let child_name = format!("{}-mapped-{}", name, child.name());
            let derived = map_tree(&child_name, child, function, next, Some(top))?;
            set_parent(&*derived, Some(&*node))?;
            create_dependency(top, &*derived)?;
        }
    }
    Ok(node)
}
