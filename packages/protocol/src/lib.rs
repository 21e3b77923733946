//! Mungo Protocol: the messages that cross the isolation boundary.
//!
//! The dataset graph never holds a reference to user code. Transform and
//! predicate bodies live inside an isolated evaluator, and the only way to
//! reach them is to exchange serialized messages:
//!
//! - `Envelope`: correlates a payload with an opaque request identifier
//! - `EvaluatorRequest`: install, delete, or query a function
//! - `EvaluatorResponse`: success flag plus content or a `Fault`
//! - `Identifier`: GUID-shaped names for functions and in-flight requests
//!
//! Everything here serializes to JSON with the field names the evaluator
//! expects on the other side, so any transport that can move a string can
//! carry it.
//!
//! # Example
//!
//! ```rust
//! use mungo_protocol::{Envelope, EvaluatorRequest, Identifier};
//! use serde_json::json;
//!
//! let request = EvaluatorRequest::Query {
//!     identifier: Identifier::generate(),
//!     datum: json!({"x": 1}),
//! };
//! let envelope = Envelope::new(Identifier::generate(), request);
//! let text = envelope.encode().unwrap();
//! assert!(text.contains("\"requestType\":\"query\""));
//! ```

mod error;
mod ident;
mod message;

pub use error::{ProtocolError, Result};
pub use ident::Identifier;
pub use message::{Envelope, EvaluatorRequest, EvaluatorResponse, Fault, FaultKind};
