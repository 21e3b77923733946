//! # mungo-cli
//!
//! Run a chain of map and filter stages over a JSON array of records.
//!
//! ## Usage
//!
//! ```bash
//! # Double every x, then keep the results above 2
//! echo '[{"x": 0}, {"x": 1}, {"x": 2}]' | mungo \
//!     --stage 'map row => row.x * 2' \
//!     --stage 'filter n => n > 2'
//!
//! # Count matching records in a file, using a block body
//! mungo --input rows.json --stage 'filter r => { return r.active === true; }' --count
//! ```
//!
//! A stage body reads like a JavaScript arrow function body: either a single
//! expression, or a `{ ... }` block that `return`s its result.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use mungo::datasets::{
    Dataset, DatasetError, DatasetRef, FilteredDataset, FunctionSource, LiteralDataset,
    MappedDataset,
};
use mungo::sandbox::SandboxError;
use mungo::{Engine, EngineConfig};
use serde_json::Value;
use thiserror::Error;

/// Mungo - run map and filter stages over JSON records
#[derive(Parser, Debug)]
#[command(name = "mungo")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON file holding an array of records (stdin when omitted)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// A stage such as 'map row => row.x * 2' or 'filter row => { return row.ok; }'
    #[arg(short, long = "stage")]
    pub stages: Vec<Stage>,

    /// Print only the number of resulting records
    #[arg(long)]
    pub count: bool,

    /// Milliseconds to wait for each evaluator response
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Iterations any single loop in a stage body may run
    #[arg(long)]
    pub max_loop_iterations: Option<u64>,

    /// Pretty-print the output
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("input must be a JSON array of records")]
    NotAnArray,

    #[error("stage {stage}: {source}")]
    Stage {
        stage: usize,
        #[source]
        source: DatasetError,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Map,
    Filter,
}

/// One step of the pipeline: `<map|filter> <parameter> => <body>`, where the
/// body is an arrow function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub kind: StageKind,
    pub parameter_name: String,
    pub body: String,
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim_start();
        let (kind, rest) = s
            .split_once(char::is_whitespace)
            .ok_or_else(|| format!("expected '<map|filter> <param> => <body>', got {:?}", s))?;
        let kind = match kind {
            "map" => StageKind::Map,
            "filter" => StageKind::Filter,
            other => return Err(format!("unknown stage kind {:?}", other)),
        };
        let (parameter_name, body) = rest
            .split_once("=>")
            .ok_or_else(|| "missing '=>' between parameter and body".to_string())?;
        let parameter_name = parameter_name.trim();
        if parameter_name.is_empty() {
            return Err("missing parameter name".to_string());
        }
        Ok(Stage {
            kind,
            parameter_name: parameter_name.to_string(),
            body: body.trim().to_string(),
        })
    }
}

impl Stage {
    /// The body as a function body: blocks pass through, expressions are
    /// returned.
    pub fn function_body(&self) -> String {
        let body = self.body.trim();
        match body.strip_prefix('{').and_then(|b| b.strip_suffix('}')) {
            Some(block) => block.to_string(),
            None => format!("return ({});", body),
        }
    }

    fn name(&self, position: usize) -> String {
        match self.kind {
            StageKind::Map => format!("map-{}", position),
            StageKind::Filter => format!("filter-{}", position),
        }
    }
}

/// Parse the input document into records.
pub fn parse_records(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str(text)? {
        Value::Array(records) => Ok(records),
        _ => Err(CliError::NotAnArray),
    }
}

fn read_input(path: Option<&Path>) -> Result<Vec<Value>> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    parse_records(&text)
}

fn engine_config(args: &Args) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(ms) = args.timeout_ms {
        config.messenger.request_timeout = Some(Duration::from_millis(ms));
    }
    if let Some(iterations) = args.max_loop_iterations {
        config.sandbox.loop_iteration_limit = iterations;
    }
    config
}

/// Apply `stages` in order to `records` and return the final dataset's
/// direct items.
pub async fn evaluate(
    records: Vec<Value>,
    stages: &[Stage],
    config: EngineConfig,
) -> Result<Vec<Value>> {
    let engine = Engine::start(config)?;
    let mut current: DatasetRef = LiteralDataset::new("input", records);

    for (position, stage) in stages.iter().enumerate() {
        let function = FunctionSource::inline(&stage.parameter_name, stage.function_body());
        let name = stage.name(position);
        let next: std::result::Result<DatasetRef, DatasetError> = match stage.kind {
            StageKind::Map => MappedDataset::new(name, current, function, engine.messenger())
                .await
                .map(|d| d as DatasetRef),
            StageKind::Filter => FilteredDataset::new(name, current, function, engine.messenger())
                .await
                .map(|d| d as DatasetRef),
        };
        current = next.map_err(|source| CliError::Stage {
            stage: position + 1,
            source,
        })?;
    }

    let items = current.get_items(false).await?;
    engine.shutdown();
    Ok(items)
}

/// Run the command described by `args` and return what should be printed.
pub async fn run(args: Args) -> Result<String> {
    let records = read_input(args.input.as_deref())?;
    let config = engine_config(&args);
    let items = evaluate(records, &args.stages, config).await?;

    if args.count {
        return Ok(items.len().to_string());
    }
    let output = Value::Array(items);
    Ok(if args.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    })
}
