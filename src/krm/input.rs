//! Ordered accumulation of resource inputs
//!
//! `InputAccumulator` collects resource documents from three shapes: raw
//! serialized bytes, already-parsed document nodes, and typed serializable
//! objects. All entry points append to one list; encounter order is
//! preserved across interleaved calls regardless of shape.
//!
//! The accumulator is a plain mutable value with no internal locking;
//! callers coordinating concurrent mutation must serialize access.

use crate::krm::document::{self, CodecError, DocumentNode};
use serde::Serialize;

/// Mutable builder collecting resource inputs into one ordered document list.
#[derive(Debug, Default)]
pub struct InputAccumulator {
    documents: Vec<DocumentNode>,
}

impl InputAccumulator {
    pub fn new() -> Self {
        InputAccumulator::default()
    }

    /// Decode and parse a raw multi-document byte stream, appending all
    /// resulting documents in order. Fails on invalid UTF-8 or malformed
    /// structured text, appending nothing.
    pub fn push_raw(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let stream = std::str::from_utf8(bytes)
            .map_err(|e| CodecError::Decode(format!("input is not valid UTF-8: {e}")))?;
        let nodes = document::parse(&document::decode(stream)?)?;
        self.documents.extend(nodes);
        Ok(())
    }

    /// Append already-parsed document nodes directly, no re-parsing.
    pub fn push_nodes(&mut self, nodes: impl IntoIterator<Item = DocumentNode>) {
        self.documents.extend(nodes);
    }

    /// Serialize typed objects into document nodes and append them.
    pub fn push_objects<T: Serialize>(
        &mut self,
        objects: impl IntoIterator<Item = T>,
    ) -> Result<(), CodecError> {
        for object in objects {
            let value = serde_yaml::to_value(&object)
                .map_err(|e| CodecError::Encode(e.to_string()))?;
            self.documents.push(DocumentNode::from_value(value));
        }
        Ok(())
    }

    /// The accumulated documents, in encounter order.
    pub fn documents(&self) -> &[DocumentNode] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Take ownership of the accumulated documents.
    pub fn into_documents(self) -> Vec<DocumentNode> {
        self.documents
    }
}
