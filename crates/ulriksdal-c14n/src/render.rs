#![forbid(unsafe_code)]

//! Shared rendering utilities for C14N output: escaping, start and end
//! tags, and leaf nodes.

use std::cmp::Ordering;

use ulriksdal_core::{ns, Error};
use ulriksdal_xml::{Attribute, Document, Element, NodeId, NodeKind, QName};

/// Where a piece of character data ends up, which decides what must be
/// written as a character reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    /// Text node content.
    Text,
    /// Attribute value, including namespace URIs.
    Attr,
    /// Processing-instruction data.
    Pi,
}

impl Escape {
    fn replacement(self, c: char) -> Option<&'static str> {
        match (self, c) {
            (Self::Text | Self::Attr, '&') => Some("&amp;"),
            (Self::Text | Self::Attr, '<') => Some("&lt;"),
            (Self::Text, '>') => Some("&gt;"),
            (Self::Attr, '"') => Some("&quot;"),
            (Self::Attr, '\t') => Some("&#x9;"),
            (Self::Attr, '\n') => Some("&#xA;"),
            (_, '\r') => Some("&#xD;"),
            _ => None,
        }
    }
}

/// Append `s` to `out`, replacing the characters `ctx` reserves.
pub fn push_escaped(out: &mut Vec<u8>, s: &str, ctx: Escape) {
    let mut clean = 0;
    for (i, c) in s.char_indices() {
        if let Some(rep) = ctx.replacement(c) {
            out.extend_from_slice(&s.as_bytes()[clean..i]);
            out.extend_from_slice(rep.as_bytes());
            clean = i + c.len_utf8();
        }
    }
    out.extend_from_slice(&s.as_bytes()[clean..]);
}

/// `prefix:local`, or just `local` for an unprefixed name.
pub fn qualified_name(name: &QName<'_>) -> String {
    match name.prefix.as_deref() {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", name.local_name),
        _ => name.local_name.to_string(),
    }
}

/// A namespace declaration to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDecl {
    /// The prefix ("" for default namespace).
    pub prefix: String,
    /// The namespace URI.
    pub uri: String,
}

impl NsDecl {
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(b" xmlns");
        if !self.prefix.is_empty() {
            out.push(b':');
            out.extend_from_slice(self.prefix.as_bytes());
        }
        out.extend_from_slice(b"=\"");
        push_escaped(out, &self.uri, Escape::Attr);
        out.push(b'"');
    }
}

impl Ord for NsDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        // "" < any prefix, so the default namespace sorts first
        self.prefix.cmp(&other.prefix)
    }
}

impl PartialOrd for NsDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An attribute to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// Namespace URI, "" for none.
    pub ns_uri: String,
    pub local_name: String,
    /// `prefix:local` or just `local`.
    pub qualified_name: String,
    pub value: String,
}

impl Attr {
    pub fn from_attribute(attr: &Attribute<'_>) -> Self {
        let ns_uri = attr.name.namespace_uri.as_deref().unwrap_or("").to_owned();
        let qualified_name = if ns_uri == ns::XML {
            format!("xml:{}", attr.name.local_name)
        } else {
            qualified_name(&attr.name)
        };
        Self {
            ns_uri,
            local_name: attr.name.local_name.to_string(),
            qualified_name,
            value: attr.value.to_string(),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(b' ');
        out.extend_from_slice(self.qualified_name.as_bytes());
        out.extend_from_slice(b"=\"");
        push_escaped(out, &self.value, Escape::Attr);
        out.push(b'"');
    }
}

impl Ord for Attr {
    fn cmp(&self, other: &Self) -> Ordering {
        // unqualified attributes first, then by (namespace URI, local name)
        match (self.ns_uri.is_empty(), other.ns_uri.is_empty()) {
            (true, true) => self.local_name.cmp(&other.local_name),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .ns_uri
                .cmp(&other.ns_uri)
                .then_with(|| self.local_name.cmp(&other.local_name)),
        }
    }
}

impl PartialOrd for Attr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub(crate) fn element<'d, 'a>(doc: &'d Document<'a>, id: NodeId) -> Result<&'d Element<'a>, Error> {
    doc.element(id)
        .ok_or_else(|| Error::Canonicalization(format!("node {} is not an element", id.index())))
}

pub(crate) fn sorted_attrs(elem: &Element<'_>) -> Vec<Attr> {
    let mut attrs: Vec<Attr> = elem.attributes.iter().map(Attr::from_attribute).collect();
    attrs.sort();
    attrs
}

pub(crate) fn write_start_tag(output: &mut Vec<u8>, name: &str, ns_decls: &[NsDecl], attrs: &[Attr]) {
    output.push(b'<');
    output.extend_from_slice(name.as_bytes());
    for ns_decl in ns_decls {
        ns_decl.write_to(output);
    }
    for attr in attrs {
        attr.write_to(output);
    }
    output.push(b'>');
}

pub(crate) fn write_end_tag(output: &mut Vec<u8>, name: &str) {
    output.extend_from_slice(b"</");
    output.extend_from_slice(name.as_bytes());
    output.push(b'>');
}

/// Render a text, comment or processing-instruction node that is in the
/// node set.  CDATA sections are plain text here and whitespace outside
/// the document element is dropped.  Comments and PIs outside
/// the document element get the separating line feeds canonical XML
/// requires.
pub(crate) fn write_leaf(output: &mut Vec<u8>, doc: &Document<'_>, id: NodeId, with_comments: bool) {
    match doc.node_kind(id) {
        Some(NodeKind::Text(text) | NodeKind::CData(text)) if !at_top_level(doc, id) => {
            push_escaped(output, text, Escape::Text);
        }
        Some(NodeKind::Comment(text)) if with_comments => {
            let top_level = at_top_level(doc, id);
            if top_level && has_preceding_element(doc, id) {
                output.push(b'\n');
            }
            output.extend_from_slice(b"<!--");
            output.extend_from_slice(text.as_bytes());
            output.extend_from_slice(b"-->");
            if top_level && has_following_element(doc, id) {
                output.push(b'\n');
            }
        }
        Some(NodeKind::ProcessingInstruction(pi)) => {
            let top_level = at_top_level(doc, id);
            if top_level && has_preceding_element(doc, id) {
                output.push(b'\n');
            }
            output.extend_from_slice(b"<?");
            output.extend_from_slice(pi.target.as_bytes());
            if let Some(data) = pi.data.as_deref().filter(|d| !d.is_empty()) {
                output.push(b' ');
                push_escaped(output, data, Escape::Pi);
            }
            output.extend_from_slice(b"?>");
            if top_level && has_following_element(doc, id) {
                output.push(b'\n');
            }
        }
        _ => {}
    }
}

fn at_top_level(doc: &Document<'_>, id: NodeId) -> bool {
    doc.parent(id)
        .is_some_and(|p| matches!(doc.node_kind(p), Some(NodeKind::Document)))
}

fn has_preceding_element(doc: &Document<'_>, id: NodeId) -> bool {
    let mut sib = doc.previous_sibling(id);
    while let Some(s) = sib {
        if doc.element(s).is_some() {
            return true;
        }
        sib = doc.previous_sibling(s);
    }
    false
}

fn has_following_element(doc: &Document<'_>, id: NodeId) -> bool {
    let mut sib = doc.next_sibling(id);
    while let Some(s) = sib {
        if doc.element(s).is_some() {
            return true;
        }
        sib = doc.next_sibling(s);
    }
    false
}
