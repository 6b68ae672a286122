//! Pipeline invocation
//!
//! Assembles the accumulated input documents, the descriptor documents,
//! and the working directory into one request to the execution substrate,
//! and captures the substrate's combined output stream verbatim. Results
//! and diagnostics produced by individual functions are not interpreted
//! here; that is the output normalizer's job.

use crate::krm::document::{self, CodecError, DocumentNode};
use crate::krm::runtime::{FunctionRuntime, RunRequest, RuntimeError};
use std::fmt;
use std::path::Path;

/// Errors from one pipeline invocation, tagged with the phase that failed
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeError {
    /// Serializing the input documents failed; nothing has run yet
    Serialize(CodecError),
    /// The execution substrate reported a failure
    Substrate(RuntimeError),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Serialize(err) => write!(f, "Failed to serialize input: {err}"),
            InvokeError::Substrate(err) => write!(f, "Substrate invocation failed: {err}"),
        }
    }
}

impl std::error::Error for InvokeError {}

impl From<RuntimeError> for InvokeError {
    fn from(err: RuntimeError) -> Self {
        InvokeError::Substrate(err)
    }
}

/// Run the function pipeline over the input documents.
///
/// Serializes `inputs` into one request stream, delegates to the substrate
/// with local executable invocation enabled, and returns the combined
/// output stream verbatim. Any substrate error propagates unchanged apart
/// from the phase tag.
pub fn invoke(
    runtime: &dyn FunctionRuntime,
    inputs: &[DocumentNode],
    functions: &[DocumentNode],
    working_dir: &Path,
) -> Result<String, InvokeError> {
    let input = document::encode(inputs).map_err(InvokeError::Serialize)?;
    log::info!(
        "invoking {} function(s) over {} input document(s)",
        functions.len(),
        inputs.len()
    );

    let request = RunRequest {
        input,
        functions: functions.to_vec(),
        working_dir: working_dir.to_path_buf(),
        enable_exec: true,
        results_dir: None,
    };

    let mut output = Vec::new();
    runtime.run(&request, &mut output)?;
    String::from_utf8(output).map_err(|e| {
        InvokeError::Substrate(RuntimeError::Execution(format!(
            "substrate output is not valid UTF-8: {e}"
        )))
    })
}
