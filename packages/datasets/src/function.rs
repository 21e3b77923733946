//! Handles to user functions that live in the isolated evaluator.

use std::sync::Arc;

use mungo_messenger::Messenger;
use mungo_protocol::Identifier;
use serde_json::Value;

use crate::error::Result;

/// Where a derived dataset's function comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionSource {
    /// Source text to install under a fresh identifier.
    Inline {
        parameter_name: String,
        body: String,
    },
    /// A function already installed in the evaluator.
    Installed(Identifier),
}

impl FunctionSource {
    pub fn inline(parameter_name: impl Into<String>, body: impl Into<String>) -> Self {
        FunctionSource::Inline {
            parameter_name: parameter_name.into(),
            body: body.into(),
        }
    }
}

impl From<Identifier> for FunctionSource {
    fn from(identifier: Identifier) -> Self {
        FunctionSource::Installed(identifier)
    }
}

/// A function in the evaluator, addressed by identifier.
///
/// The dataset graph never holds the function itself, only this handle.
#[derive(Debug, Clone)]
pub struct SandboxedFunction {
    identifier: Identifier,
    messenger: Arc<Messenger>,
}

impl SandboxedFunction {
    /// Resolve `source` to an installed function, installing it if needed.
    pub async fn bind(source: FunctionSource, messenger: Arc<Messenger>) -> Result<Self> {
        match source {
            FunctionSource::Installed(identifier) => Ok(Self {
                identifier,
                messenger,
            }),
            FunctionSource::Inline {
                parameter_name,
                body,
            } => {
                let identifier = Identifier::generate();
                messenger.install(&identifier, &parameter_name, &body).await?;
                Ok(Self {
                    identifier,
                    messenger,
                })
            }
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub async fn query(&self, datum: Value) -> Result<Value> {
        Ok(self.messenger.query(&self.identifier, datum).await?)
    }

    pub async fn mass_query(&self, data: Vec<Value>) -> Result<Vec<Value>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.messenger.mass_query(&self.identifier, data).await?)
    }

    /// Replace the function body under the same identifier.
    pub async fn update(&self, parameter_name: &str, body: &str) -> Result<()> {
        Ok(self
            .messenger
            .install(&self.identifier, parameter_name, body)
            .await?)
    }

    /// Delete the function from the evaluator.
    pub async fn release(&self) -> Result<()> {
        Ok(self.messenger.remove(&self.identifier).await?)
    }
}
