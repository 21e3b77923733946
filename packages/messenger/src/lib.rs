//! Mungo Messenger: the request/response channel to the isolated evaluator.
//!
//! The dataset graph and the evaluator share nothing but a transport that
//! moves strings. A [`Messenger`] tags each outbound request with a fresh
//! identifier, keeps a table of requests still waiting, and resolves each
//! one when an inbound envelope carrying its identifier arrives.
//!
//! ```rust,no_run
//! use mungo_messenger::{Messenger, MessengerConfig};
//! use mungo_protocol::Identifier;
//! use mungo_sandbox::{spawn_isolate, SandboxConfig};
//! use serde_json::json;
//!
//! # async fn example() -> mungo_messenger::Result<()> {
//! let (requests, responses) = spawn_isolate(SandboxConfig::default()).unwrap().into_channels();
//! let messenger = Messenger::connect(requests, responses, MessengerConfig::default());
//!
//! let double = Identifier::generate();
//! messenger.install(&double, "x", "return x * 2;").await?;
//! assert_eq!(messenger.query(&double, json!(21)).await?, json!(42));
//! # Ok(())
//! # }
//! ```

mod error;
mod messenger;
mod transport;

pub use error::{MessengerError, Result};
pub use messenger::{Messenger, MessengerConfig};
pub use transport::{ChannelTransport, Transport};
