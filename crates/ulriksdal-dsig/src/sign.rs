#![forbid(unsafe_code)]

//! XML-DSig signature creation.
//!
//! A `<Signature>` template is appended as the last child of the element
//! being signed, the reference is digested with that signature excluded,
//! and `SignedInfo` is canonicalized and signed in place.

use base64::Engine;
use tracing::{debug, trace};
use ulriksdal_c14n::C14nMode;
use ulriksdal_core::{ns, Error};
use ulriksdal_keys::Key;
use ulriksdal_xml::{Document, DocumentExt, NodeId};

use crate::context::DsigContext;
use crate::options::SignatureOptions;
use crate::reference::{digest_reference, read_inclusive_prefixes};

/// Sign the element whose ID attribute is `reference_id`.
///
/// Returns the new `Signature` element.
pub fn sign(
    ctx: &DsigContext,
    doc: &mut Document<'_>,
    reference_id: &str,
    options: &SignatureOptions,
) -> Result<NodeId, Error> {
    let target = ctx.id_map(doc).resolve(reference_id)?;
    let key = signing_key(ctx, options)?;
    let c14n_mode = C14nMode::from_uri(&options.c14n_method)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {}", options.c14n_method)))?;
    let sig_alg = ulriksdal_crypto::sign::from_uri(&options.signature_method)?;
    ulriksdal_crypto::digest::DigestMethod::from_uri(&options.digest_method)?;

    let template_xml = options.template(reference_id)?;
    let template = ulriksdal_xml::parse(&template_xml)?;
    let signature = doc.append_subtree(target, &template, template.root())?;
    debug!(
        reference_id,
        signature = signature.index(),
        key = key.algorithm_name(),
        "signature template appended"
    );

    let signed_info = child(doc, signature, ns::node::SIGNED_INFO)?;
    let reference = child(doc, signed_info, ns::node::REFERENCE)?;

    let ids = ctx.id_map(doc);
    let rd = digest_reference(ctx, doc, &ids, signature, reference)?;
    let digest_value = child(doc, reference, ns::node::DIGEST_VALUE)?;
    doc.set_text_content(digest_value, &rd.digest_base64())?;

    let c14n_method = child(doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let prefixes = read_inclusive_prefixes(doc, c14n_method);
    let c14n_signed_info =
        ulriksdal_c14n::canonicalize_subtree(doc, signed_info, c14n_mode, &prefixes)?;
    debug!(bytes = c14n_signed_info.len(), "SignedInfo canonicalized");
    if ctx.debug {
        trace!("pre-signature data:\n{}", String::from_utf8_lossy(&c14n_signed_info));
    }

    let signature_value = sig_alg.sign(&key.to_signing_key(), &c14n_signed_info)?;
    let sig_value_node = child(doc, signature, ns::node::SIGNATURE_VALUE)?;
    doc.set_text_content(
        sig_value_node,
        &base64::engine::general_purpose::STANDARD.encode(signature_value),
    )?;

    Ok(signature)
}

/// Text-in, text-out form of [`sign`].
pub fn sign_xml(
    ctx: &DsigContext,
    xml: &str,
    reference_id: &str,
    options: &SignatureOptions,
) -> Result<String, Error> {
    let mut doc = ulriksdal_xml::parse(xml)?;
    sign(ctx, &mut doc, reference_id, options)?;
    Ok(doc.to_xml())
}

/// The named key when `options.key_name` is set, else the first private
/// key usable with the signature method.
fn signing_key<'c>(ctx: &'c DsigContext, options: &SignatureOptions) -> Result<&'c Key, Error> {
    let method = &options.signature_method;
    let key = match &options.key_name {
        Some(name) => ctx
            .keys_manager
            .find_by_name(name)
            .ok_or_else(|| Error::KeyNotFound(format!("no key named {name}")))?,
        None => ctx
            .keys_manager
            .find_for_algorithm(method, true)
            .ok_or_else(|| Error::KeyNotFound(format!("no signing key for {method}")))?,
    };
    if !key.is_compatible_with(method) {
        return Err(Error::Key(format!(
            "{} key cannot be used with {method}",
            key.algorithm_name()
        )));
    }
    if !key.data.has_private() {
        return Err(Error::Key("signing requires a private key".into()));
    }
    Ok(key)
}

fn child(doc: &Document<'_>, parent: NodeId, local_name: &str) -> Result<NodeId, Error> {
    doc.first_child_element_by_name_ns(parent, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulriksdal_core::algorithm;
    use ulriksdal_keys::{loader, KeysManager};
    use ulriksdal_xml::parse;

    const SIBLINGS: &str = include_str!("../../../test-data/siblings.xml");

    fn hmac_ctx() -> DsigContext {
        let mut keys = KeysManager::new();
        keys.add_key(loader::load_hmac_key(b"shared secret").with_name("hmac"));
        DsigContext::new(keys)
    }

    fn hmac_options() -> SignatureOptions {
        SignatureOptions::new().with_signature_method(algorithm::HMAC_SHA256)
    }

    #[test]
    fn test_signature_is_last_child_of_target() {
        let ctx = hmac_ctx();
        let mut doc = parse(SIBLINGS).unwrap();
        let sig = sign(&ctx, &mut doc, "bar", &hmac_options()).unwrap();

        let bar = ctx.id_map(&doc).resolve("bar").unwrap();
        assert_eq!(doc.parent(sig), Some(bar));
        assert_eq!(doc.child_elements(bar).last().copied(), Some(sig));
        assert!(doc.next_sibling(sig).is_none());

        let digest_value = doc.get_elements_by_tag_name_ns(ns::DSIG, ns::node::DIGEST_VALUE)[0];
        assert_eq!(doc.text_content_deep(digest_value).len(), 44);
        let sig_value = doc
            .first_child_element_by_name_ns(sig, ns::DSIG, ns::node::SIGNATURE_VALUE)
            .unwrap();
        assert!(!doc.text_content_deep(sig_value).is_empty());
    }

    #[test]
    fn test_unknown_reference_id() {
        let ctx = hmac_ctx();
        let mut doc = parse(SIBLINGS).unwrap();
        let err = sign(&ctx, &mut doc, "baz", &hmac_options()).unwrap_err();
        assert!(matches!(err, Error::IdNotFound(_)));
    }

    #[test]
    fn test_key_checks_leave_document_untouched() {
        let ctx = hmac_ctx();
        let mut doc = parse(SIBLINGS).unwrap();
        let before = doc.to_xml();

        let rsa = SignatureOptions::default();
        assert!(matches!(
            sign(&ctx, &mut doc, "bar", &rsa).unwrap_err(),
            Error::KeyNotFound(_)
        ));
        let wrong = SignatureOptions::default().with_key_name("hmac");
        assert!(matches!(sign(&ctx, &mut doc, "bar", &wrong).unwrap_err(), Error::Key(_)));
        let bad_digest = hmac_options().with_digest_method("urn:nope");
        assert!(matches!(
            sign(&ctx, &mut doc, "bar", &bad_digest).unwrap_err(),
            Error::UnsupportedAlgorithm(_)
        ));
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_sign_xml_prefixed() {
        let ctx = hmac_ctx();
        let options = hmac_options().with_prefix("ds").with_key_name("hmac");
        let xml = sign_xml(&ctx, SIBLINGS, "foo", &options).unwrap();
        assert!(xml.contains(r#"<ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">"#));
        assert!(xml.contains("<ds:KeyName>hmac</ds:KeyName>"));
        let doc = parse(&xml).unwrap();
        assert_eq!(doc.get_elements_by_tag_name_ns(ns::DSIG, ns::node::SIGNATURE).len(), 3);
    }
}
