#![forbid(unsafe_code)]

//! XML-DSig signature verification.
//!
//! Processing order:
//! 1. Select the `<Signature>`, build the ID map for this tree
//! 2. Read `<SignedInfo>`: CanonicalizationMethod, SignatureMethod
//! 3. For each `<Reference>`: resolve URI, run transforms, compute digest, compare
//! 4. Resolve the verification key from `<KeyInfo>` or the keys manager
//! 5. Canonicalize `<SignedInfo>`
//! 6. Verify `<SignatureValue>`

use std::fmt;

use base64::Engine;
use tracing::{debug, trace, warn};
use ulriksdal_c14n::C14nMode;
use ulriksdal_core::{ns, Error};
use ulriksdal_keys::Key;
use ulriksdal_xml::{Document, NodeId};

use crate::context::DsigContext;
use crate::reference::{algorithm_of, digest_reference, read_inclusive_prefixes};
use crate::selector::SignatureSelector;

/// Why a signature did not verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// A reference URI matched no element, or more than one.
    ReferenceResolution(String),
    /// The digest input no longer hashes to `DigestValue`.
    DigestMismatch { uri: String },
    /// References are intact but `SignatureValue` does not verify.
    SignatureMismatch,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceResolution(msg) => write!(f, "reference resolution failed: {msg}"),
            Self::DigestMismatch { uri } => write!(f, "digest mismatch for reference URI={uri:?}"),
            Self::SignatureMismatch => f.write_str("signature value verification failed"),
        }
    }
}

/// Result of signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// Signature is valid.
    Valid,
    /// Signature is invalid.
    Invalid { reason: InvalidReason },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }

    fn invalid(reason: InvalidReason) -> Self {
        warn!(%reason, "signature invalid");
        VerifyResult::Invalid { reason }
    }
}

/// Verify the signature chosen by `selector`.
pub fn verify(
    ctx: &DsigContext,
    doc: &Document<'_>,
    selector: &SignatureSelector,
) -> Result<VerifyResult, Error> {
    let ids = ctx.id_map(doc);
    let sig_node = selector.select(doc, &ids)?;
    debug!(signature = sig_node.index(), ?selector, "verifying signature");

    let signed_info = child(doc, sig_node, ns::node::SIGNED_INFO)?;
    let c14n_method_node = child(doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let c14n_uri = algorithm_of(doc, signed_info, ns::node::CANONICALIZATION_METHOD)?;
    let c14n_mode = C14nMode::from_uri(c14n_uri)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")))?;
    let sig_method_uri = algorithm_of(doc, signed_info, ns::node::SIGNATURE_METHOD)?;
    let sig_alg = ulriksdal_crypto::sign::from_uri(sig_method_uri)?;

    let references = doc.child_elements_by_name_ns(signed_info, ns::DSIG, ns::node::REFERENCE);
    if references.is_empty() {
        return Err(Error::MissingElement("Reference".into()));
    }
    let mut first_failure = None;
    for reference in references {
        let expected = expected_digest(doc, reference);
        let outcome = match digest_reference(ctx, doc, &ids, sig_node, reference) {
            Ok(rd) if expected.as_deref() == Some(rd.digest.as_slice()) => None,
            Ok(rd) => Some(InvalidReason::DigestMismatch { uri: rd.uri }),
            Err(e) if e.is_reference_resolution() => {
                Some(InvalidReason::ReferenceResolution(e.to_string()))
            }
            Err(e) => return Err(e),
        };
        if let Some(reason) = outcome {
            warn!(%reason, "reference failed");
            if first_failure.is_none() {
                first_failure = Some(reason);
            }
        }
    }
    if let Some(reason) = first_failure {
        return Ok(VerifyResult::invalid(reason));
    }

    let key = verification_key(ctx, doc, sig_node, sig_method_uri)?;

    let prefixes = read_inclusive_prefixes(doc, c14n_method_node);
    let c14n_signed_info = ulriksdal_c14n::canonicalize_subtree(doc, signed_info, c14n_mode, &prefixes)?;
    if ctx.debug {
        trace!("pre-signature data:\n{}", String::from_utf8_lossy(&c14n_signed_info));
    }

    let sig_value_node = child(doc, sig_node, ns::node::SIGNATURE_VALUE)?;
    let sig_value = decode_base64(&doc.text_content_deep(sig_value_node))
        .map_err(|e| Error::Base64(format!("SignatureValue: {e}")))?;

    match sig_alg.verify(&key.to_signing_key(), &c14n_signed_info, &sig_value) {
        Ok(true) => {
            debug!(key = key.algorithm_name(), "signature valid");
            Ok(VerifyResult::Valid)
        }
        Ok(false) => Ok(VerifyResult::invalid(InvalidReason::SignatureMismatch)),
        // a malformed signature value for the key type
        Err(Error::Crypto(msg)) => {
            debug!(%msg, "signature value rejected");
            Ok(VerifyResult::invalid(InvalidReason::SignatureMismatch))
        }
        Err(e) => Err(e),
    }
}

/// Parse `xml` and verify the signature chosen by `selector`.
pub fn verify_xml(
    ctx: &DsigContext,
    xml: &str,
    selector: &SignatureSelector,
) -> Result<VerifyResult, Error> {
    let doc = ulriksdal_xml::parse(xml)?;
    verify(ctx, &doc, selector)
}

/// The decoded `DigestValue`, or `None` when it is missing or not valid
/// base64.  Either way the reference cannot match.
fn expected_digest(doc: &Document<'_>, reference: NodeId) -> Option<Vec<u8>> {
    let node = doc.first_child_element_by_name_ns(reference, ns::DSIG, ns::node::DIGEST_VALUE)?;
    decode_base64(&doc.text_content_deep(node)).ok()
}

fn verification_key<'c>(
    ctx: &'c DsigContext,
    doc: &Document<'_>,
    sig_node: NodeId,
    sig_method_uri: &str,
) -> Result<&'c Key, Error> {
    let key_name = doc
        .first_child_element_by_name_ns(sig_node, ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| doc.first_child_element_by_name_ns(ki, ns::DSIG, ns::node::KEY_NAME))
        .map(|kn| doc.text_content_deep(kn).trim().to_owned());

    let key = match key_name {
        Some(name) => ctx
            .keys_manager
            .find_by_name(&name)
            .ok_or_else(|| Error::KeyNotFound(format!("KeyName {name}")))?,
        None => ctx
            .keys_manager
            .find_for_algorithm(sig_method_uri, false)
            .ok_or_else(|| Error::KeyNotFound(format!("no key for {sig_method_uri}")))?,
    };
    if !key.is_compatible_with(sig_method_uri) {
        return Err(Error::Key(format!(
            "{} key cannot verify {sig_method_uri}",
            key.algorithm_name()
        )));
    }
    Ok(key)
}

fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(clean)
}

fn child(doc: &Document<'_>, parent: NodeId, local_name: &str) -> Result<NodeId, Error> {
    doc.first_child_element_by_name_ns(parent, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SignatureOptions;
    use crate::sign::{sign, sign_xml};
    use ulriksdal_core::algorithm;
    use ulriksdal_keys::{loader, KeyData, KeyUsage, KeysManager};
    use ulriksdal_transforms::{occurrence_index, signature_occurrences};
    use ulriksdal_xml::parse;

    const SIBLINGS: &str = include_str!("../../../test-data/siblings.xml");

    fn hmac_ctx(secret: &[u8]) -> DsigContext {
        let mut keys = KeysManager::new();
        keys.add_key(loader::load_hmac_key(secret));
        DsigContext::new(keys)
    }

    fn hmac_options() -> SignatureOptions {
        SignatureOptions::new().with_signature_method(algorithm::HMAC_SHA256)
    }

    fn bar() -> SignatureSelector {
        SignatureSelector::ChildOf("bar".into())
    }

    #[test]
    fn test_single_signed_element() {
        let ctx = hmac_ctx(b"secret");
        let xml = sign_xml(&ctx, r#"<doc><item ID="only">v</item></doc>"#, "only", &hmac_options())
            .unwrap();
        assert!(verify_xml(&ctx, &xml, &SignatureSelector::First).unwrap().is_valid());
    }

    #[test]
    fn test_second_sibling_in_memory_and_after_reparse() {
        let ctx = hmac_ctx(b"secret");
        let mut doc = parse(SIBLINGS).unwrap();
        let sig = sign(&ctx, &mut doc, "bar", &hmac_options()).unwrap();

        let bar_node = ctx.id_map(&doc).resolve("bar").unwrap();
        assert_eq!(occurrence_index(&doc, bar_node, sig).unwrap(), 2);
        assert_eq!(occurrence_index(&doc, doc.root(), sig).unwrap(), 3);

        assert_eq!(verify(&ctx, &doc, &bar()).unwrap(), VerifyResult::Valid);
        assert_eq!(verify(&ctx, &doc, &SignatureSelector::First).unwrap(), VerifyResult::Valid);

        let xml = doc.to_xml();
        let reparsed = parse(&xml).unwrap();
        assert_eq!(verify(&ctx, &reparsed, &bar()).unwrap(), VerifyResult::Valid);
        assert_eq!(
            verify(&ctx, &reparsed, &SignatureSelector::Occurrence(3)).unwrap(),
            VerifyResult::Valid
        );
    }

    #[test]
    fn test_both_siblings_signed() {
        let ctx = hmac_ctx(b"secret");
        let mut doc = parse(SIBLINGS).unwrap();
        let foo_sig = sign(&ctx, &mut doc, "foo", &hmac_options()).unwrap();
        let bar_sig = sign(&ctx, &mut doc, "bar", &hmac_options()).unwrap();

        let digest_of = |doc: &Document<'_>, sig: NodeId| {
            let dv = doc.get_elements_by_tag_name_ns(ns::DSIG, ns::node::DIGEST_VALUE);
            let dv = dv.into_iter().find(|d| doc.is_ancestor_or_self(sig, *d)).unwrap();
            doc.text_content_deep(dv)
        };
        assert_ne!(digest_of(&doc, foo_sig), digest_of(&doc, bar_sig));

        let xml = doc.to_xml();
        let reparsed = parse(&xml).unwrap();
        for selector in [SignatureSelector::ChildOf("foo".into()), bar()] {
            assert!(verify(&ctx, &reparsed, &selector).unwrap().is_valid());
        }
        assert_eq!(signature_occurrences(&reparsed, reparsed.root()).len(), 4);
    }

    #[test]
    fn test_mutated_digest_value() {
        let ctx = hmac_ctx(b"secret");
        let mut doc = parse(SIBLINGS).unwrap();
        let sig = sign(&ctx, &mut doc, "bar", &hmac_options()).unwrap();
        let dv = doc.get_elements_by_tag_name_ns(ns::DSIG, ns::node::DIGEST_VALUE)[0];
        let expected = VerifyResult::Invalid {
            reason: InvalidReason::DigestMismatch { uri: "#bar".into() },
        };

        for replacement in ["AAAA", "", "not base64!"] {
            doc.set_text_content(dv, replacement).unwrap();
            assert_eq!(verify(&ctx, &doc, &bar()).unwrap(), expected);
        }

        // a Reference without any DigestValue cannot match either
        doc.detach(dv);
        assert_eq!(verify(&ctx, &doc, &bar()).unwrap(), expected);
        assert!(doc.parent(sig).is_some());
    }

    #[test]
    fn test_mutated_content() {
        let ctx = hmac_ctx(b"secret");
        let xml = sign_xml(&ctx, SIBLINGS, "bar", &hmac_options()).unwrap();
        let tampered = xml.replace("bar-content", "bar-c0ntent");
        let result = verify_xml(&ctx, &tampered, &bar()).unwrap();
        assert!(matches!(
            result,
            VerifyResult::Invalid { reason: InvalidReason::DigestMismatch { .. } }
        ));
    }

    #[test]
    fn test_wrong_key_is_signature_mismatch() {
        let xml = sign_xml(&hmac_ctx(b"secret"), SIBLINGS, "bar", &hmac_options()).unwrap();
        let result = verify_xml(&hmac_ctx(b"other"), &xml, &bar()).unwrap();
        assert_eq!(
            result,
            VerifyResult::Invalid { reason: InvalidReason::SignatureMismatch }
        );
    }

    #[test]
    fn test_reference_resolution_failures() {
        let ctx = hmac_ctx(b"secret");
        let xml = sign_xml(&ctx, SIBLINGS, "bar", &hmac_options()).unwrap();

        let duplicate = xml.replace(r#"ID="foo""#, r#"ID="bar""#);
        let result = verify_xml(&ctx, &duplicate, &SignatureSelector::Occurrence(3)).unwrap();
        assert!(matches!(
            result,
            VerifyResult::Invalid { reason: InvalidReason::ReferenceResolution(_) }
        ));

        let missing = xml.replace(r#"ID="bar""#, r#"ID="baz""#);
        let result = verify_xml(&ctx, &missing, &SignatureSelector::First).unwrap();
        assert!(matches!(
            result,
            VerifyResult::Invalid { reason: InvalidReason::ReferenceResolution(_) }
        ));
    }

    #[test]
    fn test_placeholder_selected_is_an_error() {
        let ctx = hmac_ctx(b"secret");
        let xml = sign_xml(&ctx, SIBLINGS, "bar", &hmac_options()).unwrap();
        let err = verify_xml(&ctx, &xml, &SignatureSelector::Occurrence(2)).unwrap_err();
        assert!(matches!(err, Error::MissingElement(_)));
    }

    #[test]
    fn test_rsa_with_key_name() {
        let mut signer = KeysManager::new();
        signer.add_key(
            loader::load_pem_auto(include_bytes!("../../../test-data/keys/rsa-2048.pem"))
                .unwrap()
                .with_name("rsa"),
        );
        let options = SignatureOptions::default().with_key_name("rsa").with_prefix("ds");
        let xml = sign_xml(&DsigContext::new(signer), SIBLINGS, "bar", &options).unwrap();

        let mut verifier = KeysManager::new();
        verifier.add_key(loader::load_hmac_key(b"unrelated").with_name("other"));
        verifier.add_key(
            loader::load_pem_auto(include_bytes!("../../../test-data/keys/rsa-2048-pub.pem"))
                .unwrap()
                .with_name("rsa"),
        );
        let ctx = DsigContext::new(verifier);
        assert!(verify_xml(&ctx, &xml, &bar()).unwrap().is_valid());

        let renamed = xml.replace("<ds:KeyName>rsa<", "<ds:KeyName>nobody<");
        assert!(matches!(
            verify_xml(&ctx, &renamed, &bar()).unwrap_err(),
            Error::KeyNotFound(_)
        ));
    }

    #[test]
    fn test_ecdsa_inclusive_c14n() {
        let sk = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let public = *sk.verifying_key();
        let mut signer = KeysManager::new();
        signer.add_key(Key::new(KeyData::EcP256 { private: Some(sk), public }, KeyUsage::Sign));
        let options = SignatureOptions::new()
            .with_signature_method(algorithm::ECDSA_SHA384)
            .with_c14n_method(algorithm::C14N)
            .with_digest_method(algorithm::SHA512);
        let xml = sign_xml(&DsigContext::new(signer), SIBLINGS, "bar", &options).unwrap();

        let mut verifier = KeysManager::new();
        verifier.add_key(Key::new(KeyData::EcP256 { private: None, public }, KeyUsage::Verify));
        let ctx = DsigContext::new(verifier);
        assert!(verify_xml(&ctx, &xml, &bar()).unwrap().is_valid());

        let sig_value_start = xml.find("<SignatureValue>").unwrap() + "<SignatureValue>".len();
        let mut tampered = xml.clone();
        tampered.replace_range(sig_value_start..sig_value_start + 4, "AAAA");
        let result = verify_xml(&ctx, &tampered, &bar()).unwrap();
        assert_eq!(
            result,
            VerifyResult::Invalid { reason: InvalidReason::SignatureMismatch }
        );
    }
}
