#![forbid(unsafe_code)]

//! URI resolution for XML-DSig references.
//!
//! Only same-document references are dereferenced; see
//! [`ulriksdal_xml::xpath`] for the accepted forms.

use tracing::debug;
use ulriksdal_core::Error;
use ulriksdal_xml::xpath::{self, SameDocumentRef};
use ulriksdal_xml::{Document, IdMap, NodeSet};

use crate::pipeline::TransformData;

/// Resolve a Reference URI against `doc` and return the initial node set.
pub fn resolve_uri<'a>(
    uri: &str,
    doc: &'a Document<'a>,
    ids: &IdMap,
) -> Result<TransformData<'a>, Error> {
    let data = match xpath::parse_reference_uri(uri)? {
        SameDocumentRef::Document { with_comments } => TransformData::Xml {
            doc,
            root: doc.root(),
            node_set: if with_comments {
                NodeSet::all(doc)
            } else {
                NodeSet::all_without_comments(doc)
            },
        },
        SameDocumentRef::Id { id, with_comments } => {
            let root = ids.resolve(id)?;
            TransformData::Xml {
                doc,
                root,
                node_set: if with_comments {
                    NodeSet::tree_with_comments(root, doc)
                } else {
                    NodeSet::tree_without_comments(root, doc)
                },
            }
        }
    };
    if let TransformData::Xml { root, node_set, .. } = &data {
        debug!(uri, root = root.index(), nodes = node_set.len(), "reference resolved");
    }
    Ok(data)
}
