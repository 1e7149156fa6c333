#![forbid(unsafe_code)]

//! XML Canonicalization (C14N) for the Ulriksdal XML-DSig library.
//!
//! Implements all six W3C canonicalization variants:
//! - Canonical XML 1.0 (with and without comments)
//! - Canonical XML 1.1 (with and without comments)
//! - Exclusive Canonical XML 1.0 (with and without comments)
//!
//! Canonicalization reads the document and an optional [`NodeSet`]; it
//! never modifies the tree.

pub mod exclusive;
pub mod inclusive;
pub mod inclusive11;
pub mod render;

use ulriksdal_core::{algorithm, Error};
use ulriksdal_xml::{Document, NodeId, NodeSet};

/// The canonicalization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMode {
    /// Canonical XML 1.0
    Inclusive,
    /// Canonical XML 1.0 with comments
    InclusiveWithComments,
    /// Canonical XML 1.1
    Inclusive11,
    /// Canonical XML 1.1 with comments
    Inclusive11WithComments,
    /// Exclusive Canonical XML 1.0
    Exclusive,
    /// Exclusive Canonical XML 1.0 with comments
    ExclusiveWithComments,
}

impl C14nMode {
    /// Get the algorithm URI for this mode.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Inclusive => algorithm::C14N,
            Self::InclusiveWithComments => algorithm::C14N_WITH_COMMENTS,
            Self::Inclusive11 => algorithm::C14N11,
            Self::Inclusive11WithComments => algorithm::C14N11_WITH_COMMENTS,
            Self::Exclusive => algorithm::EXC_C14N,
            Self::ExclusiveWithComments => algorithm::EXC_C14N_WITH_COMMENTS,
        }
    }

    /// Parse a C14N mode from an algorithm URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithm::C14N => Some(Self::Inclusive),
            algorithm::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithm::C14N11 => Some(Self::Inclusive11),
            algorithm::C14N11_WITH_COMMENTS => Some(Self::Inclusive11WithComments),
            algorithm::EXC_C14N => Some(Self::Exclusive),
            algorithm::EXC_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn with_comments(&self) -> bool {
        matches!(
            self,
            Self::InclusiveWithComments | Self::Inclusive11WithComments | Self::ExclusiveWithComments
        )
    }

    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }
}

/// Canonicalize a parsed document, or the part of it selected by
/// `node_set`.
///
/// `inclusive_prefixes` is only consulted by the exclusive modes.
pub fn canonicalize(
    doc: &Document<'_>,
    mode: C14nMode,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    match mode {
        C14nMode::Inclusive | C14nMode::InclusiveWithComments => {
            inclusive::canonicalize(doc, mode.with_comments(), node_set)
        }
        C14nMode::Inclusive11 | C14nMode::Inclusive11WithComments => {
            inclusive11::canonicalize(doc, mode.with_comments(), node_set)
        }
        C14nMode::Exclusive | C14nMode::ExclusiveWithComments => {
            exclusive::canonicalize(doc, mode.with_comments(), node_set, inclusive_prefixes)
        }
    }
}

/// Canonicalize the subtree rooted at `root`.
pub fn canonicalize_subtree(
    doc: &Document<'_>,
    root: NodeId,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let node_set = if mode.with_comments() {
        NodeSet::tree_with_comments(root, doc)
    } else {
        NodeSet::tree_without_comments(root, doc)
    };
    canonicalize(doc, mode, Some(&node_set), inclusive_prefixes)
}

/// Convenience: parse XML text and canonicalize the whole document.
pub fn canonicalize_xml(
    xml: &str,
    mode: C14nMode,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let doc = ulriksdal_xml::parse(xml)?;
    canonicalize(&doc, mode, None, inclusive_prefixes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulriksdal_core::ns;
    use ulriksdal_xml::{parse, DocumentExt};

    #[test]
    fn test_mode_uri_round_trip() {
        for uri in algorithm::ALL_C14N {
            let mode = C14nMode::from_uri(uri).unwrap();
            assert_eq!(mode.uri(), *uri);
        }
        assert!(C14nMode::from_uri(algorithm::SHA256).is_none());
    }

    #[test]
    fn test_subtree_inclusive_vs_exclusive() {
        let xml = r#"<doc xmlns:x="urn:x"><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature></doc>"#;
        let doc = parse(xml).unwrap();
        let si = doc.find_element(ns::DSIG, "SignedInfo").unwrap();

        let inc = canonicalize_subtree(&doc, si, C14nMode::Inclusive, &[]).unwrap();
        assert_eq!(
            String::from_utf8(inc).unwrap(),
            r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:x="urn:x"></ds:SignedInfo>"#
        );
        let exc = canonicalize_subtree(&doc, si, C14nMode::Exclusive, &[]).unwrap();
        assert_eq!(
            String::from_utf8(exc).unwrap(),
            r#"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"></ds:SignedInfo>"#
        );
    }

    #[test]
    fn test_excluded_subtree_is_not_rendered() {
        let xml = r#"<a ID="bar"><content>bar-content</content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#" /></a>"#;
        let doc = parse(xml).unwrap();
        let sig = doc.find_element(ns::DSIG, "Signature").unwrap();
        let mut set = NodeSet::all_without_comments(&doc);
        set.remove_subtree(&doc, sig);
        let out = canonicalize(&doc, C14nMode::Exclusive, Some(&set), &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<a ID="bar"><content>bar-content</content></a>"#
        );
    }
}
