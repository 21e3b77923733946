//! The function table and request dispatch.

use std::collections::HashMap;

use mungo_protocol::{
    Envelope, EvaluatorRequest, EvaluatorResponse, Fault, FaultKind, Identifier,
};
use serde_json::Value;

use crate::error::Result;
use crate::js::{CompiledFunction, Engine, Limits};

/// Configuration for an isolated evaluator.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Buffer size of the inbound and outbound envelope channels.
    pub channel_capacity: usize,
    /// Iterations any single loop in a user function may run.
    pub loop_iteration_limit: u64,
    /// Nested calls allowed inside a user function.
    pub recursion_limit: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        let limits = Limits::default();
        Self {
            channel_capacity: 64,
            loop_iteration_limit: limits.loop_iterations,
            recursion_limit: limits.recursion,
        }
    }
}

impl SandboxConfig {
    fn limits(&self) -> Limits {
        Limits {
            loop_iterations: self.loop_iteration_limit,
            recursion: self.recursion_limit,
        }
    }
}

/// Holds compiled functions by identifier and answers requests against them.
///
/// The evaluator owns a JavaScript realm and cannot leave the thread that
/// created it; [`crate::spawn_isolate`] gives it a thread of its own so that
/// it is reachable only through serialized messages.
#[derive(Debug)]
pub struct Evaluator {
    engine: Engine,
    functions: HashMap<Identifier, CompiledFunction>,
}

impl Evaluator {
    pub fn new(config: &SandboxConfig) -> Result<Self> {
        Ok(Self {
            engine: Engine::new(config.limits())?,
            functions: HashMap::new(),
        })
    }

    /// Number of installed functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Answer one typed request.
    pub fn respond(&mut self, request: EvaluatorRequest) -> EvaluatorResponse {
        match request {
            EvaluatorRequest::Create {
                identifier,
                parameter_name,
                function_body,
            }
            | EvaluatorRequest::Update {
                identifier,
                parameter_name,
                function_body,
            } => match self.engine.compile(&parameter_name, &function_body) {
                Ok(function) => {
                    tracing::debug!(%identifier, "installed function");
                    self.functions.insert(identifier, function);
                    EvaluatorResponse::ok()
                }
                Err(e) => {
                    tracing::debug!(%identifier, error = %e, "function failed to compile");
                    EvaluatorResponse::failed(Fault::new(FaultKind::Compile, e.to_string()))
                }
            },

            EvaluatorRequest::Delete { identifier } => {
                if self.functions.remove(&identifier).is_some() {
                    tracing::debug!(%identifier, "deleted function");
                }
                EvaluatorResponse::ok()
            }

            EvaluatorRequest::Query { identifier, datum } => {
                let Some(function) = self.functions.get(&identifier) else {
                    return unknown_function(&identifier);
                };
                match self.engine.call(function, &datum) {
                    Ok(value) => EvaluatorResponse::with_content(value),
                    Err(e) => {
                        tracing::warn!(%identifier, error = %e, "function call failed");
                        EvaluatorResponse::failed(Fault::new(FaultKind::Evaluation, e.to_string()))
                    }
                }
            }

            EvaluatorRequest::MassQuery { identifier, data } => {
                let Some(function) = self.functions.get(&identifier) else {
                    return unknown_function(&identifier);
                };
                let results: Result<Vec<Value>> = data
                    .iter()
                    .map(|datum| self.engine.call(function, datum))
                    .collect();
                match results {
                    Ok(values) => EvaluatorResponse::with_content(Value::Array(values)),
                    Err(e) => {
                        tracing::warn!(%identifier, count = data.len(), error = %e, "mass query failed");
                        EvaluatorResponse::failed(Fault::new(FaultKind::Evaluation, e.to_string()))
                    }
                }
            }
        }
    }

    /// Answer a request that has not been validated yet.
    pub fn respond_raw(&mut self, data: Value) -> EvaluatorResponse {
        match serde_json::from_value::<EvaluatorRequest>(data) {
            Ok(request) => self.respond(request),
            Err(e) => EvaluatorResponse::failed(Fault::new(FaultKind::Protocol, e.to_string())),
        }
    }

    /// Answer one serialized envelope, producing the serialized reply.
    ///
    /// Input that is not an envelope with a `requestId` cannot be answered
    /// and yields `None`.
    pub fn handle_envelope(&mut self, text: &str) -> Option<String> {
        let envelope = match Envelope::<Value>::decode(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable envelope");
                return None;
            }
        };
        let reply = envelope.reply(self.respond_raw(envelope.data.clone()));
        match reply.encode() {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(request_id = %reply.request_id, error = %e, "failed to encode reply");
                None
            }
        }
    }
}

fn unknown_function(identifier: &Identifier) -> EvaluatorResponse {
    EvaluatorResponse::failed(Fault::new(
        FaultKind::UnknownFunction,
        format!("no function installed under {}", identifier),
    ))
}
