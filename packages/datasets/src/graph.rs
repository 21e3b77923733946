//! Structural mutation of the containment tree and the dependency graph.
//!
//! All operations here are synchronous and take one dataset's link lock at
//! a time.

use std::collections::HashSet;

use crate::dataset::{Dataset, DatasetId, DatasetRef, Edge};
use crate::error::{DatasetError, Result};

/// Move `child` under `parent`, or make it a root when `parent` is `None`.
///
/// The child is detached from its current parent first and appended to the
/// end of the new parent's children.
pub fn set_parent(child: &dyn Dataset, parent: Option<&dyn Dataset>) -> Result<()> {
    let Some(parent) = parent else {
        remove_parent(child);
        return Ok(());
    };

    let mut ancestor = Some(parent.core().upgrade().ok_or(DatasetError::Detached(parent.id()))?);
    while let Some(node) = ancestor {
        if node.id() == child.id() {
            return Err(DatasetError::CyclicContainment {
                child: child.id(),
                parent: parent.id(),
            });
        }
        ancestor = node.parent();
    }

    let strong = child.core().upgrade().ok_or(DatasetError::Detached(child.id()))?;
    remove_parent(child);
    child.core().links().parent = Some(Edge::to(parent));
    parent.core().links().children.push(strong);
    tracing::debug!(child = %child.name(), parent = %parent.name(), "set parent");
    Ok(())
}

/// Detach `child` from its parent, if it has one.
pub fn remove_parent(child: &dyn Dataset) {
    let Some(edge) = child.core().links().parent.take() else {
        return;
    };
    if let Some(parent) = edge.target.upgrade() {
        let id = child.id();
        parent.core().links().children.retain(|c| c.id() != id);
    }
}

/// Whether `to` is reachable from `from` along successor edges.
fn reaches(from: &dyn Dataset, to: DatasetId) -> bool {
    let mut seen = HashSet::new();
    let mut stack: Vec<DatasetRef> = from.successors();
    while let Some(node) = stack.pop() {
        let id = node.id();
        if id == to {
            return true;
        }
        if seen.insert(id) {
            stack.extend(node.successors());
        }
    }
    false
}

/// Record that `successor` reads from `predecessor`.
///
/// Both sides are updated together. Adding an edge that already exists is a
/// no-op; adding one that would close a cycle fails.
pub fn create_dependency(predecessor: &dyn Dataset, successor: &dyn Dataset) -> Result<()> {
    let (p, s) = (predecessor.id(), successor.id());
    if p == s || reaches(successor, p) {
        return Err(DatasetError::CyclicDependency {
            predecessor: p,
            successor: s,
        });
    }

    {
        let mut links = predecessor.core().links();
        if links.successors.iter().any(|e| e.id == s) {
            return Ok(());
        }
        links.successors.push(Edge::to(successor));
    }
    successor
        .core()
        .links()
        .predecessors
        .push(Edge::to(predecessor));
    tracing::debug!(predecessor = %predecessor.name(), successor = %successor.name(), "created dependency");
    Ok(())
}

/// Remove the dependency edge from `predecessor` to `successor`.
pub fn remove_dependency(predecessor: &dyn Dataset, successor: &dyn Dataset) -> Result<()> {
    let (p, s) = (predecessor.id(), successor.id());
    let removed = {
        let mut links = predecessor.core().links();
        let before = links.successors.len();
        links.successors.retain(|e| e.id != s);
        links.successors.len() != before
    };
    successor
        .core()
        .links()
        .predecessors
        .retain(|e| e.id != p);

    if removed {
        Ok(())
    } else {
        Err(DatasetError::DependencyNotFound {
            predecessor: p,
            successor: s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LiteralDataset;
    use serde_json::json;

    fn literal(name: &str) -> std::sync::Arc<LiteralDataset> {
        LiteralDataset::new(name, vec![json!(1)])
    }

    #[test]
    fn parent_and_generation() {
        let root = literal("root");
        let mid = literal("mid");
        let leaf = literal("leaf");
        set_parent(&*mid, Some(&*root)).unwrap();
        set_parent(&*leaf, Some(&*mid)).unwrap();

        assert_eq!(root.generation(), 0);
        assert_eq!(mid.generation(), 1);
        assert_eq!(leaf.generation(), 2);
        assert_eq!(root.children()[0].id(), mid.id());
        assert_eq!(leaf.parent().unwrap().id(), mid.id());
    }

    #[test]
    fn reparenting_moves_the_child() {
        let a = literal("a");
        let b = literal("b");
        let child = literal("child");
        set_parent(&*child, Some(&*a)).unwrap();
        set_parent(&*child, Some(&*b)).unwrap();

        assert!(a.children().is_empty());
        assert_eq!(b.children().len(), 1);
        assert_eq!(child.generation(), 1);

        set_parent(&*child, None).unwrap();
        assert!(b.children().is_empty());
        assert_eq!(child.generation(), 0);
    }

    #[test]
    fn children_keep_insertion_order() {
        let root = literal("root");
        let kids: Vec<_> = ["x", "y", "z"].iter().map(|n| literal(n)).collect();
        for kid in &kids {
            set_parent(&**kid, Some(&*root)).unwrap();
        }
        let names: Vec<String> = root.children().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["x", "y", "z"]);
    }

    #[test]
    fn containment_cycles_are_rejected() {
        let a = literal("a");
        let b = literal("b");
        set_parent(&*b, Some(&*a)).unwrap();
        assert!(matches!(
            set_parent(&*a, Some(&*b)),
            Err(DatasetError::CyclicContainment { .. })
        ));
        assert!(matches!(
            set_parent(&*a, Some(&*a)),
            Err(DatasetError::CyclicContainment { .. })
        ));
        assert_eq!(a.generation(), 0);
    }

    #[test]
    fn dependencies_are_paired() {
        let p = literal("p");
        let s = literal("s");
        create_dependency(&*p, &*s).unwrap();
        assert_eq!(p.successors()[0].id(), s.id());
        assert_eq!(s.predecessors()[0].id(), p.id());

        // Idempotent.
        create_dependency(&*p, &*s).unwrap();
        assert_eq!(p.successors().len(), 1);

        remove_dependency(&*p, &*s).unwrap();
        assert!(p.successors().is_empty());
        assert!(s.predecessors().is_empty());
        assert!(matches!(
            remove_dependency(&*p, &*s),
            Err(DatasetError::DependencyNotFound { .. })
        ));
    }

    #[test]
    fn dependency_cycles_are_rejected() {
        let a = literal("a");
        let b = literal("b");
        let c = literal("c");
        create_dependency(&*a, &*b).unwrap();
        create_dependency(&*b, &*c).unwrap();

        assert!(matches!(
            create_dependency(&*c, &*a),
            Err(DatasetError::CyclicDependency { .. })
        ));
        assert!(matches!(
            create_dependency(&*a, &*a),
            Err(DatasetError::CyclicDependency { .. })
        ));
        // A diamond is fine.
        create_dependency(&*a, &*c).unwrap();
    }

    #[test]
    fn dependency_edges_do_not_keep_datasets_alive() {
        let p = literal("p");
        let s = literal("s");
        create_dependency(&*p, &*s).unwrap();
        drop(s);
        assert!(p.successors().is_empty());
    }

    #[test]
    fn containment_and_dependency_are_independent() {
        let a = literal("a");
        let b = literal("b");
        set_parent(&*b, Some(&*a)).unwrap();
        assert!(a.successors().is_empty());
        create_dependency(&*b, &*a).unwrap();
        assert_eq!(b.generation(), 1);
    }
}
