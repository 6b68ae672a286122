//! Output normalization
//!
//! Decodes the execution substrate's raw output stream back into typed
//! resource collections: either generic document nodes, or typed objects
//! deserialized through a JSON-equivalent intermediate value. Returned
//! order always matches the order the substrate emitted documents, which
//! functions may differ from the caller's input order.

use crate::krm::document::{self, CodecError, DocumentNode};
use serde::de::DeserializeOwned;

/// Decode the substrate output stream into generic document nodes.
pub fn to_nodes(stream: &str) -> Result<Vec<DocumentNode>, CodecError> {
    document::parse(&document::decode(stream)?)
}

/// Decode the substrate output stream into typed objects.
///
/// Each document is converted through a JSON-equivalent intermediate
/// value; a conversion failure on any one document fails the whole call,
/// identifying the offending index. Untyped structured output is
/// `to_typed::<serde_json::Value>`.
pub fn to_typed<T: DeserializeOwned>(stream: &str) -> Result<Vec<T>, CodecError> {
    let raw = document::decode(stream)?;
    raw.iter()
        .enumerate()
        .map(|(index, text)| {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(text).map_err(|e| CodecError::Parse {
                    index,
                    reason: e.to_string(),
                })?;
            let json = serde_json::to_value(&yaml).map_err(|e| CodecError::Parse {
                index,
                reason: e.to_string(),
            })?;
            serde_json::from_value(json).map_err(|e| CodecError::Parse {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Resource {
        kind: String,
        #[serde(default)]
        replicas: Option<u32>,
    }

    #[test]
    fn test_to_nodes_preserves_emission_order() {
        let stream = "kind: Deployment\n---\nkind: Service\n";
        let nodes = to_nodes(stream).unwrap();
        let kinds: Vec<_> = nodes.iter().filter_map(DocumentNode::kind).collect();
        assert_eq!(kinds, ["Deployment", "Service"]);
    }

    #[test]
    fn test_to_typed_deserializes_each_document() {
        let stream = "kind: Service\n---\nkind: Deployment\nreplicas: 3\n";
        let resources: Vec<Resource> = to_typed(stream).unwrap();
        assert_eq!(
            resources,
            [
                Resource {
                    kind: "Service".to_string(),
                    replicas: None,
                },
                Resource {
                    kind: "Deployment".to_string(),
                    replicas: Some(3),
                },
            ]
        );
    }

    #[test]
    fn test_to_typed_untyped_values() {
        let stream = "kind: Service\n";
        let values: Vec<serde_json::Value> = to_typed(stream).unwrap();
        assert_eq!(values[0]["kind"], "Service");
    }

    #[test]
    fn test_to_typed_identifies_failing_index() {
        let stream = "kind: Service\n---\nkind: Deployment\nreplicas: not-a-number\n";
        match to_typed::<Resource>(stream) {
            Err(CodecError::Parse { index, .. }) => assert_eq!(index, 1),
            other => panic!("Expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream_is_empty_list() {
        assert!(to_nodes("").unwrap().is_empty());
        assert!(to_typed::<serde_json::Value>("").unwrap().is_empty());
    }
}
