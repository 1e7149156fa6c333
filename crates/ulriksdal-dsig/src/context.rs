#![forbid(unsafe_code)]

//! DSig context: keys and configuration for signature operations.

use ulriksdal_core::ns;
use ulriksdal_keys::KeysManager;
use ulriksdal_xml::{Document, IdMap};

/// Context for XML-DSig operations.
#[derive(Debug, Default)]
pub struct DsigContext {
    /// Keys manager for key lookup.
    pub keys_manager: KeysManager,
    /// ID attribute names registered in addition to `Id`, `ID` and `id`.
    pub id_attrs: Vec<String>,
    /// Log pre-digest and pre-signature bytes at `trace` level.
    pub debug: bool,
}

impl DsigContext {
    /// Create a new DSig context with the given keys manager.
    pub fn new(keys_manager: KeysManager) -> Self {
        Self {
            keys_manager,
            ..Self::default()
        }
    }

    /// Add an ID attribute name to register during processing.
    pub fn add_id_attr(&mut self, name: &str) {
        if !self.id_attrs.iter().any(|a| a == name) {
            self.id_attrs.push(name.to_owned());
        }
    }

    /// Build the ID map for `doc` from the default and configured
    /// attribute names.  Called for every operation, never cached, so the
    /// map always describes the tree at hand.
    pub fn id_map(&self, doc: &Document<'_>) -> IdMap {
        let mut names: Vec<&str> = ns::DEFAULT_ID_ATTRS.to_vec();
        names.extend(self.id_attrs.iter().map(String::as_str));
        IdMap::build(doc, &names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_id_attrs() {
        let doc = ulriksdal_xml::parse(r#"<r xmlns:wsu="urn:wsu"><a wsu:Id="x"/><b ID="y"/></r>"#).unwrap();
        let mut ctx = DsigContext::default();
        assert!(ctx.id_map(&doc).resolve("x").is_err());
        ctx.add_id_attr("wsu:Id");
        ctx.add_id_attr("wsu:Id");
        assert_eq!(ctx.id_attrs.len(), 1);
        let ids = ctx.id_map(&doc);
        assert!(ids.resolve("x").is_ok());
        assert!(ids.resolve("y").is_ok());
    }
}
