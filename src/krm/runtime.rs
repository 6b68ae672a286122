//! Execution substrate contract
//!
//! This layer never runs functions itself. Everything about execution,
//! spawning containers or local processes, resource limits, diagnostics,
//! lives behind the `FunctionRuntime` trait. The staging layer hands a
//! substrate one `RunRequest` and reads the resulting multi-document
//! stream back from the output sink.

use crate::krm::document::DocumentNode;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// One invocation request handed to the execution substrate.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Serialized multi-document input stream
    pub input: String,
    /// Function descriptor documents, in pipeline order
    pub functions: Vec<DocumentNode>,
    /// Working directory for the invocation
    pub working_dir: PathBuf,
    /// Whether local executable invocation is permitted
    pub enable_exec: bool,
    /// Optional directory for per-function result files
    pub results_dir: Option<PathBuf>,
}

/// Failure reported by the execution substrate
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    Execution(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Execution(reason) => write!(f, "Function execution failed: {reason}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Contract for the external function-execution substrate.
///
/// On success the substrate has written the resulting multi-document
/// stream to `output`. How individual functions are executed is entirely
/// the implementor's concern; this crate never inspects it.
pub trait FunctionRuntime: Send + Sync {
    fn run(&self, request: &RunRequest, output: &mut dyn io::Write) -> Result<(), RuntimeError>;
}
