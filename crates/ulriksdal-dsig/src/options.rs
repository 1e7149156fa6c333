#![forbid(unsafe_code)]

//! Signing options and the `<Signature>` template they describe.

use ulriksdal_core::{algorithm, ns, Error};
use ulriksdal_xml::XmlWriter;

/// Algorithms and presentation of a signature created by [`crate::sign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureOptions {
    /// `CanonicalizationMethod` of `SignedInfo`, also used as the
    /// reference's canonicalization transform.
    pub c14n_method: String,
    pub signature_method: String,
    pub digest_method: String,
    /// Namespace prefix for the signature elements (`ds`), or `None` for a
    /// default namespace declaration.
    pub prefix: Option<String>,
    /// Emitted as `KeyInfo/KeyName`, and used to pick the signing key.
    pub key_name: Option<String>,
    /// `Id` attribute of the `Signature` element.
    pub signature_id: Option<String>,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            c14n_method: algorithm::EXC_C14N.to_owned(),
            signature_method: algorithm::RSA_SHA256.to_owned(),
            digest_method: algorithm::SHA256.to_owned(),
            prefix: None,
            key_name: None,
            signature_id: None,
        }
    }
}

impl SignatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c14n_method(mut self, uri: impl Into<String>) -> Self {
        self.c14n_method = uri.into();
        self
    }

    pub fn with_signature_method(mut self, uri: impl Into<String>) -> Self {
        self.signature_method = uri.into();
        self
    }

    pub fn with_digest_method(mut self, uri: impl Into<String>) -> Self {
        self.digest_method = uri.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    pub fn with_key_name(mut self, name: impl Into<String>) -> Self {
        self.key_name = Some(name.into());
        self
    }

    pub fn with_signature_id(mut self, id: impl Into<String>) -> Self {
        self.signature_id = Some(id.into());
        self
    }

    /// Render the `<Signature>` template for a reference to `#reference_id`,
    /// with empty `DigestValue` and `SignatureValue`.
    pub fn template(&self, reference_id: &str) -> Result<String, Error> {
        let name = |local: &str| match &self.prefix {
            Some(p) => format!("{p}:{local}"),
            None => local.to_owned(),
        };
        let xmlns = match &self.prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_owned(),
        };
        let uri = format!("#{reference_id}");

        let mut w = XmlWriter::new();
        let mut sig_attrs = vec![(xmlns.as_str(), ns::DSIG)];
        if let Some(id) = &self.signature_id {
            sig_attrs.push((ns::attr::ID, id.as_str()));
        }
        w.start_element(&name(ns::node::SIGNATURE), &sig_attrs)?;

        w.start_element(&name(ns::node::SIGNED_INFO), &[])?;
        w.empty_element(
            &name(ns::node::CANONICALIZATION_METHOD),
            &[(ns::attr::ALGORITHM, self.c14n_method.as_str())],
        )?;
        w.empty_element(
            &name(ns::node::SIGNATURE_METHOD),
            &[(ns::attr::ALGORITHM, self.signature_method.as_str())],
        )?;
        w.start_element(&name(ns::node::REFERENCE), &[(ns::attr::URI, uri.as_str())])?;
        w.start_element(&name(ns::node::TRANSFORMS), &[])?;
        w.empty_element(
            &name(ns::node::TRANSFORM),
            &[(ns::attr::ALGORITHM, algorithm::ENVELOPED_SIGNATURE)],
        )?;
        w.empty_element(
            &name(ns::node::TRANSFORM),
            &[(ns::attr::ALGORITHM, self.c14n_method.as_str())],
        )?;
        w.end_element(&name(ns::node::TRANSFORMS))?;
        w.empty_element(
            &name(ns::node::DIGEST_METHOD),
            &[(ns::attr::ALGORITHM, self.digest_method.as_str())],
        )?;
        w.empty_element(&name(ns::node::DIGEST_VALUE), &[])?;
        w.end_element(&name(ns::node::REFERENCE))?;
        w.end_element(&name(ns::node::SIGNED_INFO))?;

        w.empty_element(&name(ns::node::SIGNATURE_VALUE), &[])?;
        if let Some(key_name) = &self.key_name {
            w.start_element(&name(ns::node::KEY_INFO), &[])?;
            w.text_element(&name(ns::node::KEY_NAME), &[], key_name)?;
            w.end_element(&name(ns::node::KEY_INFO))?;
        }

        w.end_element(&name(ns::node::SIGNATURE))?;
        w.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulriksdal_xml::{parse, DocumentExt};

    #[test]
    fn test_default_template() {
        let xml = SignatureOptions::default().template("bar").unwrap();
        let doc = parse(&xml).unwrap();
        let sig = doc.document_element().unwrap();
        assert!(doc.has_name(sig, ns::DSIG, ns::node::SIGNATURE));
        let reference = doc.find_element(ns::DSIG, ns::node::REFERENCE).unwrap();
        assert_eq!(doc.attribute(reference, ns::attr::URI), Some("#bar"));
        let transforms = doc.get_elements_by_tag_name_ns(ns::DSIG, ns::node::TRANSFORM);
        assert_eq!(
            doc.attribute(transforms[0], ns::attr::ALGORITHM),
            Some(algorithm::ENVELOPED_SIGNATURE)
        );
        assert!(doc.find_element(ns::DSIG, ns::node::KEY_INFO).is_none());
    }

    #[test]
    fn test_prefixed_template_with_key_name() {
        let options = SignatureOptions::new()
            .with_prefix("ds")
            .with_key_name("alice & bob")
            .with_signature_id("sig-1");
        let xml = options.template("x").unwrap();
        assert!(xml.starts_with(r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#" Id="sig-1">"#));
        let doc = parse(&xml).unwrap();
        let key_name = doc.find_element(ns::DSIG, ns::node::KEY_NAME).unwrap();
        assert_eq!(doc.text_content_deep(key_name), "alice & bob");
    }

    #[test]
    fn test_empty_prefix_means_default_namespace() {
        let options = SignatureOptions::new().with_prefix("");
        assert_eq!(options.prefix, None);
    }
}
