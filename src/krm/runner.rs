//! Fluent runner construction and execution
//!
//! `RunnerBuilder` composes the input accumulator, the descriptor builder,
//! the pipeline invoker, and the output normalizer into one executable
//! unit. Construction-time failures from `with_*` calls are not raised
//! immediately; they accumulate on the builder instance and surface as one
//! aggregated error at `build()`. Each builder owns its own pending-error
//! state, so independent builders never interfere.
//!
//! # Examples
//!
//! ```ignore
//! let runner = Runner::builder(runtime)
//!     .with_input(service_yaml.as_bytes())
//!     .with_functions([Function::from_image("gcr.io/kpt-fn/set-labels:v0.1")])
//!     .build()?;
//! let resources = runner.execute()?;
//! ```

use crate::krm::document::{CodecError, DocumentNode};
use crate::krm::function::{self, Function, FunctionError};
use crate::krm::input::InputAccumulator;
use crate::krm::invoke::{self, InvokeError};
use crate::krm::output;
use crate::krm::runtime::FunctionRuntime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors from building or executing a runner
#[derive(Debug)]
pub enum RunnerError {
    /// One or more `with_*` calls failed; carries every individual
    /// message, newline-joined, in call order
    Build(String),
    /// Input or output documents could not be processed
    Codec(CodecError),
    /// A function spec was invalid
    Function(FunctionError),
    /// The pipeline invocation failed
    Invoke(InvokeError),
    /// The execution working directory could not be resolved
    WorkingDir(String),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Build(messages) => write!(f, "{messages}"),
            RunnerError::Codec(err) => write!(f, "{err}"),
            RunnerError::Function(err) => write!(f, "{err}"),
            RunnerError::Invoke(err) => write!(f, "{err}"),
            RunnerError::WorkingDir(reason) => {
                write!(f, "Cannot resolve working directory: {reason}")
            }
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<CodecError> for RunnerError {
    fn from(err: CodecError) -> Self {
        RunnerError::Codec(err)
    }
}

impl From<FunctionError> for RunnerError {
    fn from(err: FunctionError) -> Self {
        RunnerError::Function(err)
    }
}

impl From<InvokeError> for RunnerError {
    fn from(err: InvokeError) -> Self {
        RunnerError::Invoke(err)
    }
}

/// Fluent builder for a `Runner`.
///
/// Owned and mutable: every method takes the builder by value and returns
/// it, and `build()` consumes it. Failures inside `with_*` calls are
/// deferred; the chain keeps going and `build()` reports everything at
/// once.
pub struct RunnerBuilder {
    runtime: Box<dyn FunctionRuntime>,
    input: InputAccumulator,
    functions: Vec<DocumentNode>,
    working_dir: Option<PathBuf>,
    pending: Vec<String>,
}

impl RunnerBuilder {
    fn new(runtime: Box<dyn FunctionRuntime>) -> Self {
        RunnerBuilder {
            runtime,
            input: InputAccumulator::new(),
            functions: Vec::new(),
            working_dir: None,
            pending: Vec::new(),
        }
    }

    /// Add resources from a raw multi-document byte stream.
    pub fn with_input(mut self, bytes: &[u8]) -> Self {
        if let Err(err) = self.input.push_raw(bytes) {
            self.pending.push(err.to_string());
        }
        self
    }

    /// Add already-parsed document nodes.
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = DocumentNode>) -> Self {
        self.input.push_nodes(nodes);
        self
    }

    /// Add typed resource objects.
    pub fn with_inputs<T: Serialize>(mut self, objects: impl IntoIterator<Item = T>) -> Self {
        if let Err(err) = self.input.push_objects(objects) {
            self.pending.push(err.to_string());
        }
        self
    }

    /// Add functions to the pipeline, in order. Each spec is validated and
    /// turned into its descriptor document here; a failing spec fails the
    /// whole batch and defers the error to `build()`.
    pub fn with_functions(mut self, functions: impl IntoIterator<Item = Function>) -> Self {
        let functions: Vec<Function> = functions.into_iter().collect();
        match function::build_descriptors(&functions) {
            Ok(descriptors) => self.functions.extend(descriptors),
            Err(err) => self.pending.push(err.to_string()),
        }
        self
    }

    /// Override the execution working directory. Defaults to the process
    /// working directory, resolved per execution.
    pub fn where_exec_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Finalize the builder.
    ///
    /// If any `with_*` call failed, returns the aggregated pending error
    /// and no runner; an invalid runner is never handed out.
    pub fn build(self) -> Result<Runner, RunnerError> {
        if !self.pending.is_empty() {
            return Err(RunnerError::Build(self.pending.join("\n")));
        }
        Ok(Runner {
            runtime: self.runtime,
            inputs: self.input.into_documents(),
            functions: self.functions,
            working_dir: self.working_dir,
        })
    }
}

/// Executable pipeline unit: accumulated inputs, descriptor documents, and
/// the substrate to run them on.
pub struct Runner {
    runtime: Box<dyn FunctionRuntime>,
    inputs: Vec<DocumentNode>,
    functions: Vec<DocumentNode>,
    working_dir: Option<PathBuf>,
}

impl Runner {
    /// Start building a runner on the given execution substrate.
    pub fn builder(runtime: Box<dyn FunctionRuntime>) -> RunnerBuilder {
        RunnerBuilder::new(runtime)
    }

    /// Run the pipeline and normalize the output into document nodes.
    ///
    /// Blocks until the substrate returns. Any error aborts the whole
    /// execution; no partial resource list is returned.
    pub fn execute(&self) -> Result<Vec<DocumentNode>, RunnerError> {
        let stream = self.invoke_pipeline()?;
        Ok(output::to_nodes(&stream)?)
    }

    /// Run the pipeline and normalize the output into typed objects.
    pub fn execute_typed<T: DeserializeOwned>(&self) -> Result<Vec<T>, RunnerError> {
        let stream = self.invoke_pipeline()?;
        Ok(output::to_typed(&stream)?)
    }

    fn invoke_pipeline(&self) -> Result<String, RunnerError> {
        let working_dir = self.resolve_working_dir()?;
        Ok(invoke::invoke(
            self.runtime.as_ref(),
            &self.inputs,
            &self.functions,
            &working_dir,
        )?)
    }

    fn resolve_working_dir(&self) -> Result<PathBuf, RunnerError> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().map_err(|e| RunnerError::WorkingDir(e.to_string())),
        }
    }
}

/// One-shot entry point driven by a YAML configuration file with top-level
/// `image`, `exec`, and `configMap` fields. Stages `input` against the
/// configured function and returns the substrate's raw output stream.
pub fn run_with_config_file(
    runtime: &dyn FunctionRuntime,
    input: &[u8],
    config: &Path,
) -> Result<String, RunnerError> {
    let function = Function::from_file(config)?;
    let descriptor = function::build_descriptor(&function)?;

    let mut accumulator = InputAccumulator::new();
    accumulator.push_raw(input)?;

    let working_dir =
        std::env::current_dir().map_err(|e| RunnerError::WorkingDir(e.to_string()))?;
    Ok(invoke::invoke(
        runtime,
        accumulator.documents(),
        &[descriptor],
        &working_dir,
    )?)
}
