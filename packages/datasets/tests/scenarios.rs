//! End-to-end walks through a literal source with a map and a filter on it.

mod common;

use common::{as_ref, literal, messenger};
use mungo_datasets::{Dataset, FilteredDataset, FunctionSource, MappedDataset};
use serde_json::{json, Value};

fn points() -> Vec<Value> {
    vec![
        json!({"x": 0, "y": 0}),
        json!({"x": 1, "y": 1}),
        json!({"x": 2, "y": 4}),
    ]
}

#[tokio::test]
async fn map_and_filter_one_literal() {
    let messenger = messenger();
    let l = literal("L", points());

    let m = MappedDataset::new(
        "M",
        as_ref(&l),
        FunctionSource::inline("d", "return d.x * 2;"),
        messenger.clone(),
    )
    .await
    .unwrap();
    assert_eq!(
        m.get_items(false).await.unwrap(),
        vec![json!(0), json!(2), json!(4)]
    );

    let f = FilteredDataset::new(
        "F",
        as_ref(&l),
        FunctionSource::inline("x", "return x.y > 0;"),
        messenger,
    )
    .await
    .unwrap();
    assert_eq!(
        f.get_items(false).await.unwrap(),
        vec![json!({"x": 1, "y": 1}), json!({"x": 2, "y": 4})]
    );
    assert_eq!(f.count_direct_items().await.unwrap(), 2);
}

#[tokio::test]
async fn literal_update_rescans_the_filter() {
    let l = literal("L", points());
    let f = FilteredDataset::new(
        "F",
        as_ref(&l),
        FunctionSource::inline("x", "return x.y > 0;"),
        messenger(),
    )
    .await
    .unwrap();

    assert_eq!(f.count_direct_items().await.unwrap(), 2);
    assert_eq!(f.included_indices(), vec![1, 2]);
    assert_eq!(f.next_index(), 3);

    l.updated();
    assert!(f.included_indices().is_empty());
    assert_eq!(f.next_index(), 0);

    assert_eq!(f.count_direct_items().await.unwrap(), 2);
    assert_eq!(f.included_indices(), vec![1, 2]);
}

#[tokio::test]
async fn both_derived_datasets_are_successors_of_the_literal() {
    let messenger = messenger();
    let l = literal("L", points());
    let m = MappedDataset::new(
        "M",
        as_ref(&l),
        FunctionSource::inline("d", "return d.x;"),
        messenger.clone(),
    )
    .await
    .unwrap();
    let f = FilteredDataset::new(
        "F",
        as_ref(&l),
        FunctionSource::inline("d", "return true;"),
        messenger,
    )
    .await
    .unwrap();

    let mut successors: Vec<_> = l.successors().iter().map(|s| s.id()).collect();
    successors.sort();
    let mut expected = vec![m.id(), f.id()];
    expected.sort();
    assert_eq!(successors, expected);
    assert_eq!(m.predecessors()[0].id(), l.id());
    assert_eq!(f.predecessors()[0].id(), l.id());
}
