//! User functions compiled and run by an embedded JavaScript engine.
//!
//! A body is compiled exactly as `new Function(parameterName, body)` would
//! compile it, so it must `return` its result. Values cross into the engine
//! with [`JsValue::from_json`] and come back out through the engine's own
//! `JSON.stringify`, which maps `undefined`, `NaN`, and `Infinity` to `null`.

use boa_engine::{Context, JsObject, JsString, JsValue, Source};
use serde_json::Value;

use crate::error::{Result, SandboxError};

/// Runtime limits applied to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Limits {
    /// Iterations any single loop may run.
    pub(crate) loop_iterations: u64,
    /// Nested calls allowed.
    pub(crate) recursion: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            loop_iterations: 1_000_000,
            recursion: 256,
        }
    }
}

/// A compiled user function. Only meaningful to the [`Engine`] that made it.
#[derive(Debug, Clone)]
pub(crate) struct CompiledFunction(JsObject);

/// One JavaScript realm holding every installed function.
pub(crate) struct Engine {
    context: Context,
    function_constructor: JsObject,
    stringify: JsObject,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn js_string(text: &str) -> JsValue {
    JsValue::from(JsString::from(text))
}

impl Engine {
    pub(crate) fn new(limits: Limits) -> Result<Self> {
        let mut context = Context::default();
        let runtime_limits = context.runtime_limits_mut();
        runtime_limits.set_loop_iteration_limit(limits.loop_iterations);
        runtime_limits.set_recursion_limit(limits.recursion);

        let function_constructor = global(&mut context, "Function")?;
        let stringify = global(&mut context, "JSON.stringify")?;
        Ok(Self {
            context,
            function_constructor,
            stringify,
        })
    }

    /// Compile `body` as a function of one parameter.
    pub(crate) fn compile(&mut self, parameter_name: &str, body: &str) -> Result<CompiledFunction> {
        if !is_identifier(parameter_name) {
            return Err(SandboxError::InvalidParameter(parameter_name.to_string()));
        }
        let function = self
            .function_constructor
            .call(
                &JsValue::undefined(),
                &[js_string(parameter_name), js_string(body)],
                &mut self.context,
            )
            .map_err(|e| SandboxError::Compile(e.to_string()))?;
        match function.as_callable() {
            Some(callable) => Ok(CompiledFunction(callable.clone())),
            None => Err(SandboxError::Compile("body did not produce a function".into())),
        }
    }

    /// Apply `function` to `datum`.
    pub(crate) fn call(&mut self, function: &CompiledFunction, datum: &Value) -> Result<Value> {
        let argument = JsValue::from_json(datum, &mut self.context)
            .map_err(|e| SandboxError::Conversion(e.to_string()))?;
        let result = function
            .0
            .call(&JsValue::undefined(), &[argument], &mut self.context)
            .map_err(|e| SandboxError::Evaluation(e.to_string()))?;
        self.to_json(result)
    }

    fn to_json(&mut self, value: JsValue) -> Result<Value> {
        let text = self
            .stringify
            .call(&JsValue::undefined(), &[value], &mut self.context)
            .map_err(|e| SandboxError::Conversion(e.to_string()))?;
        match text.as_string() {
            Some(text) => serde_json::from_str(&text.to_std_string_escaped())
                .map_err(|e| SandboxError::Conversion(e.to_string())),
            // undefined, functions, and symbols have no JSON form
            None => Ok(Value::Null),
        }
    }
}

fn global(context: &mut Context, expression: &str) -> Result<JsObject> {
    let value = context
        .eval(Source::from_bytes(expression))
        .map_err(|e| SandboxError::Engine(e.to_string()))?;
    match value.as_callable() {
        Some(callable) => Ok(callable.clone()),
        None => Err(SandboxError::Engine(format!("{} is not callable", expression))),
    }
}
