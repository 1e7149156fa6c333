#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N).
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//! With comments: `http://www.w3.org/2001/10/xml-exc-c14n#WithComments`
//!
//! The key difference from inclusive C14N: only "visibly utilized" namespace
//! declarations are output.  A namespace is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList.

use std::collections::{BTreeMap, BTreeSet};

use ulriksdal_core::Error;
use ulriksdal_xml::{Document, DocumentExt, NodeId, NodeKind, NodeSet};

use crate::render::{self, NsDecl};

/// Canonicalize using Exclusive C14N 1.0.
///
/// `inclusive_prefixes` is the InclusiveNamespaces PrefixList; `#default`
/// names the default namespace.
pub fn canonicalize(
    doc: &Document<'_>,
    with_comments: bool,
    node_set: Option<&NodeSet>,
    inclusive_prefixes: &[String],
) -> Result<Vec<u8>, Error> {
    let inclusive_prefixes = inclusive_prefixes
        .iter()
        .map(|p| if p == "#default" { String::new() } else { p.clone() })
        .collect();
    let mut output = Vec::new();
    let ctx = ExcC14nContext {
        doc,
        with_comments,
        node_set,
        inclusive_prefixes,
    };
    ctx.process_node(doc.root(), &mut output, &BTreeMap::new())?;
    Ok(output)
}

struct ExcC14nContext<'a> {
    doc: &'a Document<'a>,
    with_comments: bool,
    node_set: Option<&'a NodeSet>,
    inclusive_prefixes: BTreeSet<String>,
}

impl ExcC14nContext<'_> {
    fn is_visible(&self, id: NodeId) -> bool {
        self.node_set.map_or(true, |ns| ns.contains(id))
    }

    fn process_node(
        &self,
        id: NodeId,
        output: &mut Vec<u8>,
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        match self.doc.node_kind(id) {
            Some(NodeKind::Document) => {
                for child in self.doc.children(id) {
                    self.process_node(child, output, rendered_ns)?;
                }
            }
            Some(NodeKind::Element(_)) => self.process_element(id, output, rendered_ns)?,
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
        rendered_ns: &BTreeMap<String, String>,
    ) -> Result<(), Error> {
        if !self.is_visible(id) {
            // namespace declarations are only rendered on output start tags
            for child in self.doc.children(id) {
                self.process_node(child, output, rendered_ns)?;
            }
            return Ok(());
        }

        let elem = render::element(self.doc, id)?;

        let mut utilized: BTreeSet<String> = self.inclusive_prefixes.clone();
        utilized.insert(elem.name.prefix.as_deref().unwrap_or("").to_owned());
        for attr in &elem.attributes {
            if let Some(prefix) = attr.name.prefix.as_deref() {
                utilized.insert(prefix.to_owned());
            }
        }

        let in_scope = self.doc.in_scope_namespaces(id);
        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            match in_scope.get(prefix) {
                Some(uri) if rendered_ns.get(prefix) != Some(uri) => ns_decls.push(NsDecl {
                    prefix: prefix.clone(),
                    uri: uri.clone(),
                }),
                Some(_) => {}
                None if prefix.is_empty() => {
                    // a default namespace rendered above must be undone
                    if rendered_ns.get("").is_some_and(|u| !u.is_empty()) {
                        ns_decls.push(NsDecl {
                            prefix: String::new(),
                            uri: String::new(),
                        });
                    }
                }
                None => {}
            }
        }
        ns_decls.sort();

        let attrs = render::sorted_attrs(elem);
        let name = render::qualified_name(&elem.name);
        render::write_start_tag(output, &name, &ns_decls, &attrs);

        let mut child_rendered_ns = rendered_ns.clone();
        for ns_decl in &ns_decls {
            child_rendered_ns.insert(ns_decl.prefix.clone(), ns_decl.uri.clone());
        }
        for child in self.doc.children(id) {
            self.process_node(child, output, &child_rendered_ns)?;
        }

        render::write_end_tag(output, &name);
        Ok(())
    }
}
