//! Request, response, and envelope shapes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::ident::Identifier;

/// Correlates a payload with the request it belongs to.
///
/// A response envelope carries the same `requestId` as the request that
/// produced it, with `data` replaced by the evaluator's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Identifier of the in-flight request.
    pub request_id: Identifier,

    /// The request or response payload.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wrap a payload under a request identifier.
    pub fn new(request_id: Identifier, data: T) -> Self {
        Self { request_id, data }
    }

    /// Build the reply envelope for this request, keeping its identifier.
    pub fn reply<U>(&self, data: U) -> Envelope<U> {
        Envelope {
            request_id: self.request_id.clone(),
            data,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serialize the envelope to JSON text.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Parse an envelope from JSON text.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A control or query message for the isolated evaluator.
///
/// `Create` and `Update` behave identically: both compile the body and
/// install it under the identifier, replacing any previous entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "requestType",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum EvaluatorRequest {
    Create {
        identifier: Identifier,
        parameter_name: String,
        function_body: String,
    },
    Update {
        identifier: Identifier,
        parameter_name: String,
        function_body: String,
    },
    Delete {
        identifier: Identifier,
    },
    Query {
        identifier: Identifier,
        datum: Value,
    },
    MassQuery {
        identifier: Identifier,
        data: Vec<Value>,
    },
}

impl EvaluatorRequest {
    /// The function identifier this request addresses.
    pub fn identifier(&self) -> &Identifier {
        match self {
            EvaluatorRequest::Create { identifier, .. }
            | EvaluatorRequest::Update { identifier, .. }
            | EvaluatorRequest::Delete { identifier }
            | EvaluatorRequest::Query { identifier, .. }
            | EvaluatorRequest::MassQuery { identifier, .. } => identifier,
        }
    }

    /// The wire name of this request's type.
    pub fn request_type(&self) -> &'static str {
        match self {
            EvaluatorRequest::Create { .. } => "create",
            EvaluatorRequest::Update { .. } => "update",
            EvaluatorRequest::Delete { .. } => "delete",
            EvaluatorRequest::Query { .. } => "query",
            EvaluatorRequest::MassQuery { .. } => "massQuery",
        }
    }
}

/// Category of an evaluator-side failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FaultKind {
    /// The request was malformed or had an unrecognized `requestType`.
    Protocol,
    /// No function is installed under the requested identifier.
    UnknownFunction,
    /// The function body failed to compile.
    Compile,
    /// The function failed while running.
    Evaluation,
}

/// Error indicator carried by an unsuccessful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// The evaluator's reply to one request.
///
/// A successful query carries its result in `content`. A JSON `null` result
/// and an absent `content` both read back as `Value::Null` through
/// [`EvaluatorResponse::content`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Fault>,
}

impl EvaluatorResponse {
    /// A successful reply with no content (install and delete).
    pub fn ok() -> Self {
        Self {
            success: true,
            content: None,
            error: None,
        }
    }

    /// A successful reply carrying a result.
    pub fn with_content(content: Value) -> Self {
        Self {
            success: true,
            content: Some(content),
            error: None,
        }
    }

    /// An unsuccessful reply.
    pub fn failed(fault: Fault) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(fault),
        }
    }

    /// The reply content, treating an absent field as `null`.
    pub fn content(self) -> Value {
        self.content.unwrap_or(Value::Null)
    }
}
