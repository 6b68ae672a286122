//! Function specs and descriptor document construction
//!
//! A `Function` declares one transformation to run: either a container
//! image or a local executable, plus a flat key/value configuration map.
//! `build_descriptor` turns a spec into the descriptor document the
//! execution substrate consumes: a ConfigMap-shaped resource carrying the
//! config under `data` and the invocation method serialized into a fixed,
//! well-known annotation.

use crate::krm::document::{CodecError, DocumentNode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Annotation key under which the invocation spec is embedded on the
/// descriptor document. The execution substrate recognizes this exact key;
/// it is not renamable.
pub const FUNCTION_ANNOTATION_KEY: &str = "config.kubernetes.io/function";

/// Container image reference grammar:
/// `[domain '/'] path-component ('/' path-component)* [(':' tag | '@' digest)]`
/// with domain components alphanumeric with optional interior hyphens and
/// an optional port, lowercase path components joined by `.`, `_`, `__` or
/// runs of `-`, tag `\w[\w.-]{0,127}`, digest `sha256:[a-f0-9]{64}`.
/// Matched against the full string, never a substring.
///
/// A leading component counts as a domain only when it contains a dot, a
/// port, or is `localhost`; otherwise it is a path component and must be
/// lowercase. `UPPERCASE/bad` is invalid, `gcr.io/fn` carries a domain.
static IMAGE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    let path_component = r"(?:[a-z0-9](?:(?:[_.]|__|[-]*)[a-z0-9]+)*)";
    let domain_component = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(
        r"(?:{domain_component}(?:\.{domain_component})+(?::[0-9]+)?|{domain_component}:[0-9]+|localhost(?::[0-9]+)?)"
    );
    let name = format!(r"(?:{domain}/)?{path_component}(?:/{path_component})*");
    let tag = r"[\w][\w.-]{0,127}";
    let digest = r"sha256:[a-f0-9]{64}";
    Regex::new(&format!(r"^(?:{name}(?::{tag}|@{digest})?)$")).unwrap()
});

/// Errors from validating a function spec or building its descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionError {
    /// Not exactly one of image/exec is set
    InvalidSpec(String),
    /// The image reference does not match the reference grammar
    InvalidImageReference(String),
    /// The function configuration could not be loaded or assembled
    Config(String),
}

impl fmt::Display for FunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionError::InvalidSpec(reason) => {
                write!(f, "Invalid function spec: {reason}")
            }
            FunctionError::InvalidImageReference(name) => {
                write!(f, "Function image reference {name:?} is invalid")
            }
            FunctionError::Config(reason) => {
                write!(f, "Function configuration error: {reason}")
            }
        }
    }
}

impl std::error::Error for FunctionError {}

impl From<CodecError> for FunctionError {
    fn from(err: CodecError) -> Self {
        FunctionError::Config(err.to_string())
    }
}

/// Declarative spec for one function to run.
///
/// Exactly one of `image`/`exec` must be set. `config_map` is a convenient
/// way to pass a flat string configuration of kind ConfigMap; keys are kept
/// in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Container image reference, e.g. `gcr.io/kpt-fn/set-labels:v0.1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Local executable path; made absolute against the process working
    /// directory at descriptor-build time, never checked for existence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,

    /// Flat key/value configuration passed to the function
    #[serde(default, rename = "configMap", skip_serializing_if = "BTreeMap::is_empty")]
    pub config_map: BTreeMap<String, String>,
}

impl Function {
    /// Spec for a container-image function.
    pub fn from_image(image: impl Into<String>) -> Self {
        Function {
            image: Some(image.into()),
            ..Function::default()
        }
    }

    /// Spec for a local-executable function.
    pub fn from_exec(path: impl Into<String>) -> Self {
        Function {
            exec: Some(path.into()),
            ..Function::default()
        }
    }

    /// Add one configuration entry.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config_map.insert(key.into(), value.into());
        self
    }

    /// Load a spec from a YAML file with top-level `image`, `exec`, and
    /// `configMap` fields.
    pub fn from_file(path: &Path) -> Result<Self, FunctionError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FunctionError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&contents).map_err(|e| {
            FunctionError::Config(format!("cannot parse {}: {e}", path.display()))
        })
    }

    /// Check that exactly one of `image`/`exec` is set. Both set and
    /// neither set are rejected; dual-set is never silently resolved.
    pub fn validate(&self) -> Result<(), FunctionError> {
        match (is_set(&self.image), is_set(&self.exec)) {
            (true, false) | (false, true) => Ok(()),
            (false, false) => Err(FunctionError::InvalidSpec(
                "either image or exec must be set".to_string(),
            )),
            (true, true) => Err(FunctionError::InvalidSpec(
                "image and exec are mutually exclusive".to_string(),
            )),
        }
    }

    /// The serialized invocation spec embedded into the function
    /// annotation: `container: {image: '<url>'}` for image functions,
    /// `exec: {path: '<absolute path>'}` for executables.
    fn invocation(&self) -> Result<String, FunctionError> {
        self.validate()?;
        if let Some(image) = self.image.as_deref().filter(|s| !s.is_empty()) {
            validate_image_reference(image)?;
            Ok(format!("container: {{image: '{image}'}}"))
        } else {
            let exec = self.exec.as_deref().unwrap_or_default();
            let path = absolute_path(exec)?;
            Ok(format!("exec: {{path: '{}'}}", path.display()))
        }
    }
}

/// Validate a container image reference against the reference grammar.
pub fn validate_image_reference(name: &str) -> Result<(), FunctionError> {
    if IMAGE_REFERENCE.is_match(name) {
        Ok(())
    } else {
        Err(FunctionError::InvalidImageReference(name.to_string()))
    }
}

/// Build the descriptor document for one function spec.
///
/// The descriptor is a fresh ConfigMap-shaped document named
/// `function-input`, with `data` populated key-by-key from the spec's
/// config map as plain string scalars and the invocation spec embedded at
/// `metadata.annotations` under [`FUNCTION_ANNOTATION_KEY`]. It is never
/// mutated after construction.
pub fn build_descriptor(function: &Function) -> Result<DocumentNode, FunctionError> {
    let invocation = function.invocation()?;

    let mut descriptor = DocumentNode::new();
    descriptor.set_path(&["apiVersion"], Value::String("v1".to_string()))?;
    descriptor.set_path(&["kind"], Value::String("ConfigMap".to_string()))?;
    descriptor.set_path(
        &["metadata", "name"],
        Value::String("function-input".to_string()),
    )?;
    descriptor.set_path(
        &["metadata", "annotations", FUNCTION_ANNOTATION_KEY],
        Value::String(invocation),
    )?;
    for (key, value) in &function.config_map {
        descriptor.set_path(&["data", key.as_str()], Value::String(value.clone()))?;
    }
    log::debug!(
        "built descriptor for {}",
        function.image.as_deref().or(function.exec.as_deref()).unwrap_or("<unset>")
    );
    Ok(descriptor)
}

/// Build descriptors for a batch of specs, in order.
pub fn build_descriptors(functions: &[Function]) -> Result<Vec<DocumentNode>, FunctionError> {
    functions.iter().map(build_descriptor).collect()
}

fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

/// Resolve a path against the process working directory. Only working
/// directory state is read; the path itself is not checked for existence,
/// which is the execution substrate's concern.
fn absolute_path(path: &str) -> Result<PathBuf, FunctionError> {
    let path = Path::new(path);
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| FunctionError::Config(format!("cannot resolve working directory: {e}")))?;
        Ok(cwd.join(path))
    }
}
