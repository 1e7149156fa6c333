#![forbid(unsafe_code)]

//! Parsing entry points and XML-DSig helpers over `uppsala::Document`.
//!
//! The tree itself is uppsala's arena DOM.  [`DocumentExt`] adds the lookups
//! the signature code needs (expanded-name checks, qualified attribute
//! lookup, in-scope namespaces) and the two mutations signing performs:
//! appending a subtree imported from a template and replacing an element's
//! text.

use std::collections::{BTreeMap, HashMap};

use tracing::trace;
use ulriksdal_core::Error;
use uppsala::{Document, NodeId, NodeKind, Parser};

/// Parse XML text.
///
/// Entity declarations in a DTD are refused; the DOCTYPE itself is
/// accepted and kept out of canonical output.
pub fn parse(text: &str) -> Result<Document<'_>, Error> {
    let doc = Parser::new()
        .with_forbid_entities(true)
        .parse(text)
        .map_err(|e| Error::XmlParse(e.to_string()))?;
    trace!(bytes = text.len(), "document parsed");
    Ok(doc)
}

/// Parse UTF-8 XML from bytes into a document that owns its text.  A byte
/// order mark is skipped.
pub fn parse_bytes(data: &[u8]) -> Result<Document<'static>, Error> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::XmlParse(format!("input is not UTF-8: {e}")))?;
    Ok(parse(text)?.into_static())
}

/// XML-DSig oriented helpers on top of the uppsala DOM.
///
/// Namespace arguments take `""` for "no namespace".
pub trait DocumentExt {
    /// Check the expanded name of an element node.
    fn has_name(&self, id: NodeId, ns_uri: &str, local_name: &str) -> bool;

    /// Attribute of an element by qualified name as written (`ID`, `wsu:Id`).
    fn attribute(&self, id: NodeId, qualified_name: &str) -> Option<&str>;

    /// Element children of `id`, in order.
    fn child_elements(&self, id: NodeId) -> Vec<NodeId>;

    /// First element in the document with the given expanded name.
    fn find_element(&self, ns_uri: &str, local_name: &str) -> Option<NodeId>;

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Namespace bindings in scope at `id`, nearest declaration winning.
    ///
    /// `xmlns=""` removes the default binding, so no value is ever empty.
    /// The implicit `xml` binding is not included.
    fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String>;

    /// Replace all children of an element with a single text node.
    fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), Error>;

    /// Deep-copy `src_node` out of `src` and append it as the last child of
    /// `parent`, returning the copy.
    ///
    /// Prefixes the copied subtree uses but inherits from outside itself are
    /// declared on the copy when `parent` binds them differently.
    fn append_subtree(
        &mut self,
        parent: NodeId,
        src: &Document<'_>,
        src_node: NodeId,
    ) -> Result<NodeId, Error>;
}

impl DocumentExt for Document<'_> {
    fn has_name(&self, id: NodeId, ns_uri: &str, local_name: &str) -> bool {
        self.element(id).is_some_and(|e| {
            e.name.local_name == local_name
                && e.name.namespace_uri.as_deref().unwrap_or("") == ns_uri
        })
    }

    fn attribute(&self, id: NodeId, qualified_name: &str) -> Option<&str> {
        let (prefix, local) = match qualified_name.split_once(':') {
            Some((p, l)) => (Some(p), l),
            None => (None, qualified_name),
        };
        self.element(id)?
            .attributes
            .iter()
            .find(|a| a.name.local_name == local && a.name.prefix.as_deref() == prefix)
            .map(|a| &*a.value)
    }

    fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children_iter(id)
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    fn find_element(&self, ns_uri: &str, local_name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|id| self.has_name(*id, ns_uri, local_name))
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    fn in_scope_namespaces(&self, id: NodeId) -> BTreeMap<String, String> {
        let mut chain = self.ancestors(id);
        chain.reverse();
        chain.push(id);

        let mut result = BTreeMap::new();
        for node in chain {
            let Some(elem) = self.element(node) else {
                continue;
            };
            for (prefix, uri) in &elem.namespace_declarations {
                let prefix: &str = prefix;
                if prefix == "xml" {
                    continue;
                }
                if uri.is_empty() {
                    result.remove(prefix);
                } else {
                    result.insert(prefix.to_owned(), uri.to_string());
                }
            }
        }
        result
    }

    fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), Error> {
        if self.element(id).is_none() {
            return Err(Error::XmlStructure(
                "text content can only be set on elements".into(),
            ));
        }
        for child in self.children(id) {
            self.detach(child);
        }
        if !text.is_empty() {
            let node = self.create_text(text.to_owned());
            self.append_child(id, node);
        }
        Ok(())
    }

    fn append_subtree(
        &mut self,
        parent: NodeId,
        src: &Document<'_>,
        src_node: NodeId,
    ) -> Result<NodeId, Error> {
        if self.element(parent).is_none() {
            return Err(Error::XmlStructure("subtrees can only be appended to elements".into()));
        }
        let src_node = match src.node_kind(src_node) {
            Some(NodeKind::Document) => src
                .document_element()
                .ok_or_else(|| Error::XmlStructure("source document is empty".into()))?,
            Some(_) => src_node,
            None => return Err(Error::XmlStructure(format!("no such node: {}", src_node.index()))),
        };

        let fixups = namespace_fixups(src, src_node, &self.in_scope_namespaces(parent));
        let copy = self
            .import_subtree(src, src_node)
            .ok_or_else(|| Error::XmlStructure("node cannot be imported".into()))?;
        for (prefix, uri) in fixups {
            self.declare_namespace(copy, Some(prefix.as_str()), uri);
        }
        self.append_child(parent, copy);
        Ok(copy)
    }
}

/// Declarations the copy of `root` needs under a parent with `present` in
/// scope.  Only prefixes actually used in the subtree and not declared
/// inside it are considered; `("", "")` undeclares a default namespace the
/// subtree must not inherit.
fn namespace_fixups(
    src: &Document<'_>,
    root: NodeId,
    present: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let wanted = src.in_scope_namespaces(root);
    let mut fixups = Vec::new();
    for prefix in inherited_prefixes(src, root) {
        let want = wanted.get(&prefix);
        if want == present.get(&prefix) {
            continue;
        }
        match want {
            Some(uri) => fixups.push((prefix, uri.clone())),
            None if prefix.is_empty() => fixups.push((String::new(), String::new())),
            None => {}
        }
    }
    fixups
}

/// Prefixes used in the subtree at `root` whose binding comes from outside
/// the subtree.  `""` stands for unprefixed element names.
fn inherited_prefixes(doc: &Document<'_>, root: NodeId) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut nodes = vec![root];
    nodes.extend(doc.descendants(root));
    for id in nodes {
        let Some(elem) = doc.element(id) else {
            continue;
        };
        let mut used = vec![elem.name.prefix.as_deref().unwrap_or("")];
        used.extend(
            elem.attributes
                .iter()
                .filter_map(|a| a.name.prefix.as_deref())
                .filter(|p| *p != "xml"),
        );
        for prefix in used {
            if declared_within(doc, root, id, prefix) || found.iter().any(|f| f == prefix) {
                continue;
            }
            found.push(prefix.to_owned());
        }
    }
    found
}

/// Whether `prefix` is declared on `node` or an ancestor, up to and
/// including `root`.
fn declared_within(doc: &Document<'_>, root: NodeId, node: NodeId, prefix: &str) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        let declares = doc
            .element(id)
            .is_some_and(|e| e.namespace_declarations.iter().any(|(p, _)| p == prefix));
        if declares {
            return true;
        }
        if id == root {
            return false;
        }
        current = doc.parent(id);
    }
    false
}

// ── ID registry ──────────────────────────────────────────────────────

/// Maps ID attribute values to the elements carrying them.
///
/// Duplicate values are kept, not overwritten, so a lookup of a value used
/// by two elements can be reported as ambiguous instead of silently picking
/// one of them.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    ids: HashMap<String, Vec<NodeId>>,
}

impl IdMap {
    /// Register every element carrying one of `attr_names` (qualified names
    /// as written, e.g. `ID` or `wsu:Id`).
    pub fn build(doc: &Document<'_>, attr_names: &[&str]) -> Self {
        let mut ids: HashMap<String, Vec<NodeId>> = HashMap::new();
        for node in doc.descendants(doc.root()) {
            for name in attr_names {
                if let Some(value) = doc.attribute(node, name) {
                    let entry = ids.entry(value.to_owned()).or_default();
                    if !entry.contains(&node) {
                        entry.push(node);
                    }
                }
            }
        }
        Self { ids }
    }

    /// Resolve an ID value to exactly one element.
    pub fn resolve(&self, id: &str) -> Result<NodeId, Error> {
        match self.ids.get(id).map(Vec::as_slice) {
            None | Some([]) => Err(Error::IdNotFound(id.to_owned())),
            Some([node]) => Ok(*node),
            Some(nodes) => Err(Error::DuplicateId(format!(
                "{id} is carried by {} elements",
                nodes.len()
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulriksdal_core::ns;

    const SIBLINGS: &str = r#"<xml><a ID="foo"><content>foo-content</content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#" /></a><a ID="bar"><content>bar-content</content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#" /></a></xml>"#;

    #[test]
    fn test_names_and_namespaces() {
        let doc = parse(SIBLINGS).unwrap();
        let sigs = doc.get_elements_by_tag_name_ns(ns::DSIG, "Signature");
        assert_eq!(sigs.len(), 2);
        let a_bar = doc.parent(sigs[1]).unwrap();
        assert_eq!(doc.attribute(a_bar, "ID"), Some("bar"));

        // the unprefixed <a> elements are in no namespace
        assert!(doc.has_name(a_bar, "", "a"));
        assert_eq!(
            doc.in_scope_namespaces(sigs[0]).get("").map(String::as_str),
            Some(ns::DSIG)
        );
        assert!(doc.in_scope_namespaces(a_bar).is_empty());
    }

    #[test]
    fn test_undeclared_default_namespace() {
        let doc = parse(r#"<r xmlns="urn:r" xmlns:p="urn:p"><x xmlns=""/></r>"#).unwrap();
        let x = doc.find_element("", "x").unwrap();
        let scope = doc.in_scope_namespaces(x);
        assert_eq!(scope.len(), 1);
        assert_eq!(scope["p"], "urn:p");
    }

    #[test]
    fn test_qualified_attribute_lookup() {
        let doc = parse(r#"<r xmlns:wsu="urn:wsu" Id="plain" wsu:Id="body"/>"#).unwrap();
        let r = doc.document_element().unwrap();
        assert_eq!(doc.attribute(r, "Id"), Some("plain"));
        assert_eq!(doc.attribute(r, "wsu:Id"), Some("body"));
        assert_eq!(doc.attribute(r, "x:Id"), None);
    }

    #[test]
    fn test_append_subtree_declares_missing_namespaces() {
        let mut doc = parse(r#"<r xmlns="urn:outer"><x/></r>"#).unwrap();
        let fragment = parse(r#"<s:w xmlns:s="urn:s"><plain/></s:w>"#).unwrap();
        let r = doc.document_element().unwrap();
        let copy = doc.append_subtree(r, &fragment, fragment.root()).unwrap();
        assert!(doc.has_name(copy, "urn:s", "w"));
        assert_eq!(doc.child_elements(r).last().copied(), Some(copy));

        // <plain/> had no namespace in the fragment; it must not pick up urn:outer
        let xml = doc.to_xml();
        let reparsed = parse(&xml).unwrap();
        let w = reparsed.find_element("urn:s", "w").unwrap();
        let plain = reparsed.child_elements(w)[0];
        assert!(reparsed.has_name(plain, "", "plain"));
    }

    #[test]
    fn test_append_prefixed_subtree_adds_no_default_undeclaration() {
        let mut doc = parse(r#"<r xmlns="urn:outer"><x/></r>"#).unwrap();
        let fragment = parse(
            r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo/></ds:Signature>"#,
        )
        .unwrap();
        let r = doc.document_element().unwrap();
        let copy = doc.append_subtree(r, &fragment, fragment.root()).unwrap();
        let decls = &doc.element(copy).unwrap().namespace_declarations;
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].0, "ds");
        assert!(!doc.to_xml().contains(r#"xmlns="""#));
    }

    #[test]
    fn test_set_text_content() {
        let mut doc = parse("<r><v>old<x/></v></r>").unwrap();
        let v = doc.find_element("", "v").unwrap();
        doc.set_text_content(v, "new").unwrap();
        assert_eq!(doc.to_xml(), "<r><v>new</v></r>");
        doc.set_text_content(v, "").unwrap();
        assert_eq!(doc.text_content_deep(v), "");
        let text = doc.children(v);
        assert!(text.is_empty());
        assert!(doc.set_text_content(doc.root(), "x").is_err());
    }

    #[test]
    fn test_id_map() {
        let doc = parse(SIBLINGS).unwrap();
        let ids = IdMap::build(&doc, ns::DEFAULT_ID_ATTRS);
        let bar = ids.resolve("bar").unwrap();
        assert_eq!(doc.attribute(bar, "ID"), Some("bar"));
        assert!(matches!(ids.resolve("baz"), Err(Error::IdNotFound(_))));

        let dup = parse(r#"<r><a ID="x"/><b Id="x"/></r>"#).unwrap();
        let ids = IdMap::build(&dup, ns::DEFAULT_ID_ATTRS);
        assert!(matches!(ids.resolve("x"), Err(Error::DuplicateId(_))));
    }

    #[test]
    fn test_id_map_prefixed_attribute() {
        let xml = r#"<r xmlns:wsu="urn:wsu"><b wsu:Id="body"/></r>"#;
        let doc = parse(xml).unwrap();
        assert!(IdMap::build(&doc, ns::DEFAULT_ID_ATTRS).resolve("body").is_err());
        let ids = IdMap::build(&doc, &["wsu:Id"]);
        assert!(ids.resolve("body").is_ok());
    }

    #[test]
    fn test_entity_declarations_are_refused() {
        let xml = r#"<!DOCTYPE r [<!ENTITY e "boom">]><r>&e;</r>"#;
        assert!(matches!(parse(xml), Err(Error::XmlParse(_))));
        assert!(matches!(parse_bytes(xml.as_bytes()), Err(Error::XmlParse(_))));
    }

    #[test]
    fn test_parse_bytes_skips_bom() {
        let doc = parse_bytes(b"\xEF\xBB\xBF<r>t</r>").unwrap();
        let r = doc.document_element().unwrap();
        assert_eq!(doc.text_content_deep(r), "t");
        assert!(parse_bytes(&[0x3C, 0xFF, 0x3E]).is_err());
    }
}
