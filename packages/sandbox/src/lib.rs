//! Mungo Sandbox: the isolated evaluator for user functions.
//!
//! Transform and predicate bodies are compiled and run here, never inside
//! the dataset graph. Each body is JavaScript, compiled the way
//! `new Function(parameterName, body)` compiles it, by an embedded
//! [`boa_engine`] realm. The sandbox keeps a table of compiled functions
//! keyed by [`mungo_protocol::Identifier`] and answers `create`, `update`,
//! `delete`, `query`, and `massQuery` requests against it.
//!
//! - [`Evaluator`]: the function table and request dispatch
//! - [`spawn_isolate`]: runs an evaluator on its own thread behind a
//!   channel pair
//!
//! ```rust
//! use mungo_protocol::{EvaluatorRequest, Identifier};
//! use mungo_sandbox::{Evaluator, SandboxConfig};
//! use serde_json::json;
//!
//! let mut evaluator = Evaluator::new(&SandboxConfig::default()).unwrap();
//! let id = Identifier::generate();
//! evaluator.respond(EvaluatorRequest::Update {
//!     identifier: id.clone(),
//!     parameter_name: "row".into(),
//!     function_body: "return row.x * 2;".into(),
//! });
//! let response = evaluator.respond(EvaluatorRequest::Query {
//!     identifier: id,
//!     datum: json!({"x": 21}),
//! });
//! assert_eq!(response.content(), json!(42));
//! ```

mod error;
mod evaluator;
mod isolate;
mod js;

pub use error::{Result, SandboxError};
pub use evaluator::{Evaluator, SandboxConfig};
pub use isolate::{spawn_isolate, IsolateHandle};
