#![forbid(unsafe_code)]

//! Inclusive Canonical XML 1.0 (C14N 1.0).
//!
//! Algorithm URI: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315`
//! With comments: `http://www.w3.org/TR/2001/REC-xml-c14n-20010315#WithComments`
//!
//! Every element in the node set renders the namespace bindings in scope
//! at it that differ from those rendered by its nearest output ancestor.
//! When the node set is a document subset, elements whose parent is not
//! output also inherit the `xml:*` attributes of their ancestors.

use std::collections::BTreeMap;

use ulriksdal_core::{ns, Error};
use ulriksdal_xml::{Document, DocumentExt, NodeId, NodeKind, NodeSet};

use crate::render::{self, Attr, NsDecl};

/// Canonicalize a document (or the part of it in `node_set`) using
/// Inclusive C14N 1.0.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    let ctx = C14nContext {
        doc,
        with_comments,
        node_set,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct C14nContext<'a> {
    doc: &'a Document<'a>,
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
}

impl C14nContext<'_> {
    fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(id))
    }

    fn process_node(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match self.doc.node_kind(id) {
            Some(NodeKind::Document) => {
                for child in self.doc.children(id) {
                    self.process_node(child, output, inherited_ns)?;
                }
            }
            Some(NodeKind::Element(_)) => self.process_element(id, output, inherited_ns)?,
            Some(_) => {
                if self.is_visible(id) {
                    render::write_leaf(output, self.doc, id, self.with_comments);
                }
            }
            None => {
                return Err(Error::Canonicalization(format!("no such node: {}", id.index())));
            }
        }
        Ok(())
    }

    fn process_element(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        inherited_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(id) {
            // an element outside the node set contributes only its
            // children that are in it
            for child in self.doc.children(id) {
                self.process_node(child, output, inherited_ns)?;
            }
            return Ok(());
        }

        let elem = render::element(self.doc, id)?;
        let in_scope = self.doc.in_scope_namespaces(id);

        let mut ns_decls: Vec<NsDecl> = in_scope
            .iter()
            .filter(|(prefix, uri)| prefix.as_str() != "xml" && inherited_ns.get(*prefix) != Some(*uri))
            .map(|(prefix, uri)| NsDecl {
                prefix: prefix.clone(),
                uri: uri.clone(),
            })
            .collect();
        // a default namespace rendered above but not in scope here
        if !in_scope.contains_key("") && inherited_ns.get("").is_some_and(|u| !u.is_empty()) {
            ns_decls.push(NsDecl {
                prefix: String::new(),
                uri: String::new(),
            });
        }
        ns_decls.sort();

        let mut attrs = render::sorted_attrs(elem);
        if self.node_set.is_some() {
            let parent_hidden = self
                .doc
                .parent(id)
                .map_or(true, |p| self.doc.element(p).is_none() || !self.is_visible(p));
            if parent_hidden {
                attrs.extend(self.inherited_xml_attrs(id, &attrs));
                attrs.sort();
            }
        }

        let name = render::qualified_name(&elem.name);
        render::write_start_tag(output, &name, &ns_decls, &attrs);

        let mut child_ns = inherited_ns.clone();
        child_ns.remove("");
        for (prefix, uri) in in_scope {
            if prefix != "xml" {
                child_ns.insert(prefix, uri);
            }
        }
        for child in self.doc.children(id) {
            self.process_node(child, output, &child_ns)?;
        }

        render::write_end_tag(output, &name);
        Ok(())
    }

    /// `xml:*` attributes of all ancestors, nearest value winning, minus
    /// those the element already carries.
    fn inherited_xml_attrs(&self, id: NodeId, existing: &[Attr]) -> Vec<Attr> {
        let mut inherited: BTreeMap<String, Attr> = BTreeMap::new();
        let mut current = self.doc.parent(id);
        while let Some(ancestor) = current {
            if let Some(elem) = self.doc.element(ancestor) {
                for attr in &elem.attributes {
                    if attr.name.namespace_uri.as_deref() == Some(ns::XML) {
                        inherited
                            .entry(attr.name.local_name.to_string())
                            .or_insert_with(|| Attr::from_attribute(attr));
                    }
                }
            }
            current = self.doc.parent(ancestor);
        }

        inherited
            .into_values()
            .filter(|a| {
                !existing
                    .iter()
                    .any(|e| e.ns_uri == ns::XML && e.local_name == a.local_name)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c14n(xml: &str, with_comments: bool) -> String {
        let doc = ulriksdal_xml::parse(xml).unwrap();
        String::from_utf8(canonicalize(&doc, with_comments, None).unwrap()).unwrap()
    }

    #[test]
    fn test_simple_c14n() {
        assert_eq!(
            c14n(r#"<root><a b="1" a="2"/></root>"#, false),
            r#"<root><a a="2" b="1"></a></root>"#
        );
    }

    #[test]
    fn test_namespaces_rendered_once() {
        let out = c14n(
            r#"<root xmlns:b="http://b" xmlns:a="http://a"><a:child xmlns:a="http://a"/></root>"#,
            false,
        );
        assert_eq!(
            out,
            r#"<root xmlns:a="http://a" xmlns:b="http://b"><a:child></a:child></root>"#
        );
    }

    #[test]
    fn test_comments_at_top_level() {
        let xml = "<!--a--><r><!--b--></r><!--c-->";
        assert_eq!(c14n(xml, true), "<!--a-->\n<r><!--b--></r>\n<!--c-->");
        assert_eq!(c14n(xml, false), "<r></r>");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(
            c14n("<root>a &amp; b &lt; c &gt; d</root>", false),
            "<root>a &amp; b &lt; c &gt; d</root>"
        );
    }

    #[test]
    fn test_subset_declares_inherited_namespaces() {
        let xml = r#"<r xmlns="urn:d" xmlns:p="urn:p" xml:lang="en"><p:a><b/></p:a></r>"#;
        let doc = ulriksdal_xml::parse(xml).unwrap();
        let a = doc.find_element("urn:p", "a").unwrap();
        let set = NodeSet::tree_without_comments(a, &doc);
        let out = String::from_utf8(canonicalize(&doc, false, Some(&set)).unwrap()).unwrap();
        assert_eq!(
            out,
            r#"<p:a xmlns="urn:d" xmlns:p="urn:p" xml:lang="en"><b></b></p:a>"#
        );
    }

    #[test]
    fn test_default_namespace_undeclared() {
        let out = c14n(r#"<r xmlns="urn:d"><a xmlns=""/></r>"#, false);
        assert_eq!(out, r#"<r xmlns="urn:d"><a xmlns=""></a></r>"#);
    }
}
