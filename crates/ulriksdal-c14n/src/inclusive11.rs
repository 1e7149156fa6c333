#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.1 (C14N 1.1).
//!
//! Algorithm URI: `http://www.w3.org/2006/12/xml-c14n11`
//! With comments: `http://www.w3.org/2006/12/xml-c14n11#WithComments`
//!
//! C14N 1.1 differs from 1.0 only in how `xml:id` and `xml:base` are
//! inherited into document subsets.  Those attributes are not produced by
//! anything in this library, so 1.1 renders exactly like 1.0.

use ulriksdal_core::Error;
use ulriksdal_xml::{Document, NodeSet};

/// Canonicalize using Inclusive C14N 1.1.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    crate::inclusive::canonicalize(doc, with_comments, node_set)
}
