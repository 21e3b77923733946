//! Datasets that hold their items directly.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::Value;

use crate::dataset::{Dataset, DatasetCore, DatasetId};
use crate::error::{DatasetError, Result};

/// A terminal supplier of items. It reads from nothing.
#[derive(Debug)]
pub struct LiteralDataset {
    core: DatasetCore,
    items: Mutex<Vec<Value>>,
}

impl LiteralDataset {
    pub fn new(name: impl Into<String>, items: Vec<Value>) -> Arc<Self> {
        let name = name.into();
        Arc::new_cyclic(|this: &Weak<Self>| Self {
            core: DatasetCore::new(name, this.clone() as Weak<dyn Dataset>),
            items: Mutex::new(items),
        })
    }

    fn items(&self) -> MutexGuard<'_, Vec<Value>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace every item and notify successors.
    pub fn set_items(&self, items: Vec<Value>) {
        *self.items() = items;
        self.updated();
    }

    /// Append one item and notify successors.
    pub fn push_item(&self, item: Value) {
        self.items().push(item);
        self.updated();
    }
}

#[async_trait]
impl Dataset for LiteralDataset {
    fn core(&self) -> &DatasetCore {
        &self.core
    }

    async fn get_item(&self, index: usize) -> Result<Value> {
        let items = self.items();
        items.get(index).cloned().ok_or(DatasetError::OutOfRange {
            index,
            len: items.len(),
        })
    }

    async fn count_direct_items(&self) -> Result<usize> {
        Ok(self.items().len())
    }

    async fn get_direct_items(&self) -> Result<Vec<Value>> {
        Ok(self.items().clone())
    }

    fn predecessor_updated(&self, _predecessor: DatasetId) {}

    fn self_updated(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_parent;
    use proptest::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn holds_items_in_order() {
        let l = LiteralDataset::new("l", vec![json!("a"), json!({"b": 1})]);
        assert_eq!(l.count_direct_items().await.unwrap(), 2);
        assert_eq!(l.get_item(1).await.unwrap(), json!({"b": 1}));
        assert_eq!(l.get_items(false).await.unwrap(), vec![json!("a"), json!({"b": 1})]);
    }

    #[tokio::test]
    async fn out_of_range() {
        let l = LiteralDataset::new("l", vec![json!(1)]);
        assert!(matches!(
            l.get_item(1).await,
            Err(DatasetError::OutOfRange { index: 1, len: 1 })
        ));
    }

    #[tokio::test]
    async fn empty_literal() {
        let l = LiteralDataset::new("l", vec![]);
        assert_eq!(l.count_items().await.unwrap(), 0);
        assert!(l.get_items(true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nested_counts_and_items() {
        let root = LiteralDataset::new("root", vec![json!(0)]);
        let a = LiteralDataset::new("a", vec![json!(1), json!(2)]);
        let b = LiteralDataset::new("b", vec![]);
        let a1 = LiteralDataset::new("a1", vec![json!(3)]);
        set_parent(&*a, Some(&*root)).unwrap();
        set_parent(&*b, Some(&*root)).unwrap();
        set_parent(&*a1, Some(&*a)).unwrap();

        assert_eq!(root.count_items().await.unwrap(), 4);
        assert_eq!(a.count_items().await.unwrap(), 3);
        assert_eq!(
            root.get_items(true).await.unwrap(),
            vec![json!(0), json!(1), json!(2), json!(3)]
        );
        assert_eq!(root.get_items(false).await.unwrap(), vec![json!(0)]);
    }

    #[tokio::test]
    async fn mutation_keeps_count_in_step() {
        let l = LiteralDataset::new("l", vec![json!(1)]);
        l.push_item(json!(2));
        assert_eq!(l.count_direct_items().await.unwrap(), 2);
        l.set_items(vec![]);
        assert_eq!(l.count_direct_items().await.unwrap(), 0);
    }

    proptest! {
        #[test]
        fn count_and_get_match_construction(items in prop::collection::vec(any::<i64>(), 0..32)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let values: Vec<Value> = items.iter().map(|&i| json!(i)).collect();
            let l = LiteralDataset::new("l", values.clone());
            rt.block_on(async {
                prop_assert_eq!(l.count_direct_items().await.unwrap(), values.len());
                for (i, v) in values.iter().enumerate() {
                    prop_assert_eq!(&l.get_item(i).await.unwrap(), v);
                }
                Ok(())
            })?;
        }
    }
}
