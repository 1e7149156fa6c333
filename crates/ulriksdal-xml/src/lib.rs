#![forbid(unsafe_code)]

//! XML document layer for the Ulriksdal XML-DSig library.
//!
//! The tree is `uppsala`'s arena DOM.  This crate adds the ID registry, the
//! `NodeSet` used by canonicalization and transforms, and a template writer.

pub mod document;
pub mod nodeset;
pub mod writer;
pub mod xpath;

pub use document::{parse, parse_bytes, DocumentExt, IdMap};
pub use nodeset::NodeSet;
pub use uppsala::{Attribute, Document, Element, NodeId, NodeKind, QName};
pub use writer::XmlWriter;
