//! Error types for the dataset graph.

use mungo_messenger::MessengerError;
use thiserror::Error;

use crate::dataset::DatasetId;

/// Errors that can occur while reading or rewiring datasets.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A round trip to the evaluator failed.
    #[error("evaluator error: {0}")]
    Messenger(#[from] MessengerError),

    /// An item index past the end of the dataset's direct items.
    #[error("index {index} out of range for {len} items")]
    OutOfRange { index: usize, len: usize },

    /// The dependency edge would close a cycle.
    #[error("dependency {predecessor} -> {successor} would create a cycle")]
    CyclicDependency {
        predecessor: DatasetId,
        successor: DatasetId,
    },

    /// The parent assignment would make a dataset its own ancestor.
    #[error("cannot make {parent} the parent of its ancestor {child}")]
    CyclicContainment { child: DatasetId, parent: DatasetId },

    /// No dependency edge exists between the two datasets.
    #[error("no dependency {predecessor} -> {successor}")]
    DependencyNotFound {
        predecessor: DatasetId,
        successor: DatasetId,
    },

    /// The dataset is being dropped and can no longer be linked.
    #[error("dataset {0} is no longer alive")]
    Detached(DatasetId),
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;
