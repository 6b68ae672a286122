//! Document node and multi-document stream codec
//!
//! This module provides `DocumentNode`, the in-memory representation of one
//! structured YAML document, plus the codec that splits and joins
//! multi-document streams on the canonical `"---\n"` separator.
//!
//! # Design
//!
//! The codec round-trips every document through the YAML data model: decode
//! parses each document, scrubs the execution substrate's internal
//! bookkeeping annotations, and re-serializes. Splitting on the raw
//! separator text alone would leak bookkeeping fields and produce spurious
//! empty entries for trailing separators; parsing first avoids both.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Canonical separator between serialized documents in a stream.
///
/// This exact literal is shared with the execution substrate's own
/// document-stream reader and must not change.
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Bookkeeping annotations injected by the execution substrate while it
/// tracks documents through a pipeline. They are internal to the substrate
/// and are stripped from every decoded document.
const BOOKKEEPING_ANNOTATIONS: [&str; 4] = [
    "internal.config.kubernetes.io/index",
    "internal.config.kubernetes.io/path",
    "config.kubernetes.io/index",
    "config.kubernetes.io/path",
];

/// Errors from parsing, serializing, or splitting document streams
#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    /// The stream is not well-formed structured text
    Decode(String),
    /// One document in a batch failed to parse; `index` identifies it
    Parse { index: usize, reason: String },
    /// A document node could not be re-serialized
    Encode(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Decode(reason) => write!(f, "Malformed document stream: {reason}"),
            CodecError::Parse { index, reason } => {
                write!(f, "Document {index} failed to parse: {reason}")
            }
            CodecError::Encode(reason) => write!(f, "Failed to serialize document: {reason}"),
        }
    }
}

impl std::error::Error for CodecError {}

/// One structured document held in memory.
///
/// A `DocumentNode` supports path-based field lookup, creation, and
/// mutation, and re-serialization to text. Re-serializing a node that was
/// parsed from text and not mutated is semantically equivalent to its
/// source; field order may be canonicalized.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode(Value);

impl DocumentNode {
    /// Create an empty mapping-rooted document.
    pub fn new() -> Self {
        DocumentNode(Value::Mapping(Mapping::new()))
    }

    /// Parse a single document from text.
    pub fn parse(text: &str) -> Result<Self, CodecError> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(DocumentNode(value))
    }

    /// Wrap an already-constructed value.
    pub fn from_value(value: Value) -> Self {
        DocumentNode(value)
    }

    /// Borrow the underlying value.
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Take the underlying value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Serialize this document back to text.
    pub fn to_yaml(&self) -> Result<String, CodecError> {
        serde_yaml::to_string(&self.0).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Look up a field by path. Returns `None` if any segment is missing
    /// or an intermediate node is not a mapping.
    pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.0;
        for segment in path {
            current = current
                .as_mapping()?
                .get(&Value::String((*segment).to_string()))?;
        }
        Some(current)
    }

    /// Set a field by path, creating intermediate mappings as needed.
    ///
    /// Fails if an existing intermediate node is not a mapping.
    pub fn set_path(&mut self, path: &[&str], value: Value) -> Result<(), CodecError> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| CodecError::Decode("empty field path".to_string()))?;
        let mut current = &mut self.0;
        for segment in parents {
            let mapping = current.as_mapping_mut().ok_or_else(|| {
                CodecError::Decode(format!("field '{segment}' is not a mapping"))
            })?;
            current = mapping
                .entry(Value::String((*segment).to_string()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }
        let mapping = current
            .as_mapping_mut()
            .ok_or_else(|| CodecError::Decode(format!("field '{last}' is not a mapping")))?;
        mapping.insert(Value::String((*last).to_string()), value);
        Ok(())
    }

    /// Remove a field by path. Returns the removed value, if any.
    pub fn remove_path(&mut self, path: &[&str]) -> Option<Value> {
        let (last, parents) = path.split_last()?;
        let mut current = &mut self.0;
        for segment in parents {
            current = current
                .as_mapping_mut()?
                .get_mut(&Value::String((*segment).to_string()))?;
        }
        current
            .as_mapping_mut()?
            .remove(&Value::String((*last).to_string()))
    }

    /// The document's `kind` field, if present.
    pub fn kind(&self) -> Option<&str> {
        self.get_path(&["kind"]).and_then(Value::as_str)
    }

    /// The document's `metadata.name` field, if present.
    pub fn name(&self) -> Option<&str> {
        self.get_path(&["metadata", "name"]).and_then(Value::as_str)
    }

    /// The `metadata.annotations` map as string pairs. Missing map or
    /// non-string entries yield an empty/partial result.
    pub fn annotations(&self) -> std::collections::BTreeMap<String, String> {
        self.string_map(&["metadata", "annotations"])
    }

    /// The `metadata.labels` map as string pairs.
    pub fn labels(&self) -> std::collections::BTreeMap<String, String> {
        self.string_map(&["metadata", "labels"])
    }

    /// The `data` map as string pairs.
    pub fn data_map(&self) -> std::collections::BTreeMap<String, String> {
        self.string_map(&["data"])
    }

    fn string_map(&self, path: &[&str]) -> std::collections::BTreeMap<String, String> {
        let mut result = std::collections::BTreeMap::new();
        if let Some(Value::Mapping(mapping)) = self.get_path(path) {
            for (key, value) in mapping {
                if let (Some(key), Some(value)) = (key.as_str(), value.as_str()) {
                    result.insert(key.to_string(), value.to_string());
                }
            }
        }
        result
    }

    /// Strip the substrate's bookkeeping annotations, dropping the
    /// `annotations` and `metadata` mappings if they end up empty.
    fn scrub_bookkeeping(&mut self) {
        for key in BOOKKEEPING_ANNOTATIONS {
            self.remove_path(&["metadata", "annotations", key]);
        }
        if matches!(
            self.get_path(&["metadata", "annotations"]),
            Some(Value::Mapping(m)) if m.is_empty()
        ) {
            self.remove_path(&["metadata", "annotations"]);
        }
        if matches!(
            self.get_path(&["metadata"]),
            Some(Value::Mapping(m)) if m.is_empty()
        ) {
            self.remove_path(&["metadata"]);
        }
    }
}

impl Default for DocumentNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a multi-document stream into per-document strings.
///
/// Every document is round-tripped through the YAML data model, which
/// scrubs bookkeeping annotations and drops null documents (a trailing
/// separator or a blank document never yields a spurious empty entry).
/// Documents whose root is a bare sequence are legal and pass through.
/// An empty stream decodes to an empty list, not an error.
pub fn decode(stream: &str) -> Result<Vec<String>, CodecError> {
    if stream.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut documents = Vec::new();
    for deserializer in serde_yaml::Deserializer::from_str(stream) {
        let value =
            Value::deserialize(deserializer).map_err(|e| CodecError::Decode(e.to_string()))?;
        if value.is_null() {
            continue;
        }
        let mut node = DocumentNode::from_value(value);
        node.scrub_bookkeeping();
        documents.push(node.to_yaml()?);
    }
    log::debug!("decoded {} document(s) from stream", documents.len());
    Ok(documents)
}

/// Parse each raw document string independently.
///
/// A single malformed document fails the whole call, identifying which
/// document failed.
pub fn parse(raw: &[String]) -> Result<Vec<DocumentNode>, CodecError> {
    raw.iter()
        .enumerate()
        .map(|(index, text)| {
            let value: Value = serde_yaml::from_str(text).map_err(|e| CodecError::Parse {
                index,
                reason: e.to_string(),
            })?;
            Ok(DocumentNode::from_value(value))
        })
        .collect()
}

/// Serialize a sequence of document nodes into one stream, joined with the
/// canonical separator. Empty input yields an empty stream.
pub fn encode(nodes: &[DocumentNode]) -> Result<String, CodecError> {
    let serialized: Vec<String> = nodes
        .iter()
        .map(DocumentNode::to_yaml)
        .collect::<Result<_, _>>()?;
    Ok(serialized.join(DOCUMENT_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_reserialize_is_equivalent() {
        let source = "apiVersion: v1\nkind: Service\nmetadata:\n  name: frontend\n";
        let node = DocumentNode::parse(source).unwrap();
        let reparsed = DocumentNode::parse(&node.to_yaml().unwrap()).unwrap();
        assert_eq!(node, reparsed);
    }

    #[test]
    fn test_get_path() {
        let node = DocumentNode::parse("metadata:\n  name: frontend\n").unwrap();
        assert_eq!(
            node.get_path(&["metadata", "name"]).and_then(Value::as_str),
            Some("frontend")
        );
        assert!(node.get_path(&["metadata", "missing"]).is_none());
        assert!(node.get_path(&["metadata", "name", "deeper"]).is_none());
    }

    #[test]
    fn test_set_path_creates_intermediate_mappings() {
        let mut node = DocumentNode::new();
        node.set_path(
            &["metadata", "annotations", "key"],
            Value::String("value".to_string()),
        )
        .unwrap();
        assert_eq!(
            node.get_path(&["metadata", "annotations", "key"])
                .and_then(Value::as_str),
            Some("value")
        );
    }

    #[test]
    fn test_set_path_rejects_non_mapping_intermediate() {
        let mut node = DocumentNode::parse("metadata: scalar\n").unwrap();
        let result = node.set_path(&["metadata", "name"], Value::String("x".to_string()));
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_empty_stream() {
        assert_eq!(decode("").unwrap(), Vec::<String>::new());
        assert_eq!(decode("   \n").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_decode_trailing_separator_yields_no_empty_document() {
        let stream = "kind: Service\n---\n";
        let documents = decode(stream).unwrap();
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn test_decode_splits_in_order() {
        let stream = "kind: Service\n---\nkind: Deployment\n";
        let documents = decode(stream).unwrap();
        assert_eq!(documents.len(), 2);
        assert!(documents[0].contains("Service"));
        assert!(documents[1].contains("Deployment"));
    }

    #[test]
    fn test_decode_strips_bookkeeping_annotations() {
        let stream = "kind: Service\nmetadata:\n  annotations:\n    config.kubernetes.io/index: '0'\n    internal.config.kubernetes.io/index: '0'\n    keep-me: 'yes'\n";
        let documents = decode(stream).unwrap();
        let node = DocumentNode::parse(&documents[0]).unwrap();
        let annotations = node.annotations();
        assert_eq!(annotations.get("keep-me").map(String::as_str), Some("yes"));
        assert!(!annotations.contains_key("config.kubernetes.io/index"));
        assert!(!annotations.contains_key("internal.config.kubernetes.io/index"));
    }

    #[test]
    fn test_decode_drops_emptied_annotation_mapping() {
        let stream = "kind: Service\nmetadata:\n  annotations:\n    config.kubernetes.io/path: svc.yaml\n";
        let documents = decode(stream).unwrap();
        let node = DocumentNode::parse(&documents[0]).unwrap();
        assert!(node.get_path(&["metadata", "annotations"]).is_none());
        assert!(node.get_path(&["metadata"]).is_none());
    }

    #[test]
    fn test_decode_bare_sequence_root() {
        let documents = decode("- one\n- two\n").unwrap();
        assert_eq!(documents.len(), 1);
        let node = DocumentNode::parse(&documents[0]).unwrap();
        assert!(node.value().is_sequence());
    }

    #[test]
    fn test_decode_malformed_stream() {
        let result = decode("kind: [unclosed\n");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_parse_identifies_failing_document() {
        let raw = vec!["kind: Service\n".to_string(), "kind: [unclosed\n".to_string()];
        match parse(&raw) {
            Err(CodecError::Parse { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_empty_is_empty_stream() {
        assert_eq!(encode(&[]).unwrap(), "");
    }

    #[test]
    fn test_encode_joins_with_separator() {
        let nodes = vec![
            DocumentNode::parse("kind: Service\n").unwrap(),
            DocumentNode::parse("kind: Deployment\n").unwrap(),
        ];
        let stream = encode(&nodes).unwrap();
        assert_eq!(stream.matches(DOCUMENT_SEPARATOR).count(), 1);
        let roundtripped = parse(&decode(&stream).unwrap()).unwrap();
        assert_eq!(roundtripped, nodes);
    }

    #[test]
    fn test_string_map_accessors() {
        let node = DocumentNode::parse(
            "kind: ConfigMap\nmetadata:\n  name: cm\n  labels:\n    app: guestbook\ndata:\n  env: dev\n",
        )
        .unwrap();
        assert_eq!(node.kind(), Some("ConfigMap"));
        assert_eq!(node.name(), Some("cm"));
        assert_eq!(node.labels().get("app").map(String::as_str), Some("guestbook"));
        assert_eq!(node.data_map().get("env").map(String::as_str), Some("dev"));
    }
}
