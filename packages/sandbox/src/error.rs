//! Error types for compiling and running user functions.

use thiserror::Error;

/// Errors raised while hosting user functions.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The declared parameter name is not a plain identifier.
    #[error("invalid parameter name: {0:?}")]
    InvalidParameter(String),

    /// The engine rejected the function body.
    #[error("compile error: {0}")]
    Compile(String),

    /// The function threw, or ran past a runtime limit.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A value could not cross between JSON and the engine.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// The engine could not be set up.
    #[error("engine error: {0}")]
    Engine(String),

    /// The isolate thread or its runtime could not be started.
    #[error("failed to start isolate: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
