//! Property-based tests for the document stream codec
//!
//! For any ordered list of documents, serializing the list to one stream
//! and decoding it back must reproduce the list: order, keys, and values.

use krmfn::krm::document::{self, DocumentNode};
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use serde_yaml::Value;

/// A generated flat document: lowercase field names, printable values.
fn arbitrary_document() -> impl Strategy<Value = DocumentNode> {
    btree_map("[a-z][a-z0-9]{0,7}", "[ -~]{0,16}", 0..6).prop_map(|fields| {
        let mut node = DocumentNode::new();
        for (key, value) in fields {
            node.set_path(&[key.as_str()], Value::String(value))
                .expect("fresh mapping accepts any field");
        }
        node
    })
}

proptest! {
    #[test]
    fn roundtrip_encode_decode_parse(documents in vec(arbitrary_document(), 1..6)) {
        let stream = document::encode(&documents).unwrap();
        let decoded = document::decode(&stream).unwrap();
        let reparsed = document::parse(&decoded).unwrap();
        prop_assert_eq!(reparsed, documents);
    }

    #[test]
    fn decoded_count_matches(documents in vec(arbitrary_document(), 1..6)) {
        let stream = document::encode(&documents).unwrap();
        prop_assert_eq!(document::decode(&stream).unwrap().len(), documents.len());
    }

    #[test]
    fn single_document_text_roundtrip(document in arbitrary_document()) {
        let text = document.to_yaml().unwrap();
        prop_assert_eq!(DocumentNode::parse(&text).unwrap(), document);
    }
}
