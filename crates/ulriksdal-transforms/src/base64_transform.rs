#![forbid(unsafe_code)]

//! Base64 decode transform.

use base64::Engine;
use ulriksdal_core::{algorithm, Error};
use ulriksdal_xml::NodeKind;

use crate::pipeline::{Transform, TransformData};

/// Base64 decode transform.  A node-set input is first reduced to the text
/// of the text nodes it contains, in document order.
pub struct Base64DecodeTransform;

impl Transform for Base64DecodeTransform {
    fn uri(&self) -> &str {
        algorithm::BASE64
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let text = match &input {
            TransformData::Binary(data) => std::str::from_utf8(data)
                .map_err(|e| Error::Transform(format!("base64 input not UTF-8: {e}")))?
                .to_owned(),
            TransformData::Xml { doc, node_set, .. } => {
                let mut text = String::new();
                for id in doc.descendants(doc.root()) {
                    if let Some(NodeKind::Text(t) | NodeKind::CData(t)) = doc.node_kind(id) {
                        if node_set.contains(id) {
                            text.push_str(t);
                        }
                    }
                }
                text
            }
        };

        let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&cleaned)
            .map_err(|e| Error::Base64(format!("decode error: {e}")))?;

        Ok(TransformData::Binary(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulriksdal_xml::{parse, NodeSet};

    #[test]
    fn test_decode_element_text() {
        let doc = parse("<d>aGVs\n bG8=<!--x--></d>").unwrap();
        let input = TransformData::Xml {
            doc: &doc,
            root: doc.root(),
            node_set: NodeSet::all(&doc),
        };
        let out = Base64DecodeTransform.execute(input).unwrap();
        assert_eq!(out.to_binary().unwrap(), b"hello");
    }

    #[test]
    fn test_invalid_base64() {
        let err = Base64DecodeTransform
            .execute(TransformData::Binary(b"!!!".to_vec()))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Base64(_)));
    }
}
