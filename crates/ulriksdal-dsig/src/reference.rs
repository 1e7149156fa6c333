#![forbid(unsafe_code)]

//! Reference processing: URI dereference, transform chain and digest.
//!
//! Signing and verification share this path so both compute the digest
//! input the same way.  The enveloped-signature transform is always bound to
//! the `Signature` element being processed in the tree at hand; its
//! occurrence index is worked out when the transform runs.

use tracing::{debug, trace};
use ulriksdal_c14n::C14nMode;
use ulriksdal_core::{algorithm, ns, Error};
use ulriksdal_crypto::digest;
use ulriksdal_transforms::base64_transform::Base64DecodeTransform;
use ulriksdal_transforms::uri::resolve_uri;
use ulriksdal_transforms::{
    C14nTransform, EnvelopedSignatureTransform, Transform, TransformPipeline,
};
use ulriksdal_xml::{Document, DocumentExt, IdMap, NodeId};

use crate::context::DsigContext;

/// Digest input and output of one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDigest {
    pub uri: String,
    pub digest_method: String,
    /// The bytes fed to the digest.
    pub pre_digest: Vec<u8>,
    pub digest: Vec<u8>,
}

impl ReferenceDigest {
    /// The digest as it appears in `DigestValue`.
    pub fn digest_base64(&self) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(&self.digest)
    }
}

/// Compute the digest of `reference`, a `Reference` element inside
/// `signature`.
pub fn reference_digest(
    ctx: &DsigContext,
    doc: &Document<'_>,
    signature: NodeId,
    reference: NodeId,
) -> Result<ReferenceDigest, Error> {
    let ids = ctx.id_map(doc);
    digest_reference(ctx, doc, &ids, signature, reference)
}

pub(crate) fn digest_reference(
    ctx: &DsigContext,
    doc: &Document<'_>,
    ids: &IdMap,
    signature: NodeId,
    reference: NodeId,
) -> Result<ReferenceDigest, Error> {
    let uri = doc.attribute(reference, ns::attr::URI).unwrap_or("");
    let digest_method = algorithm_of(doc, reference, ns::node::DIGEST_METHOD)?;
    let pipeline = read_transforms(doc, reference, signature)?;

    let input = resolve_uri(uri, doc, ids)?;
    let pre_digest = pipeline.execute(input)?.to_binary()?;
    let digest = digest::digest(digest_method, &pre_digest)?;

    debug!(
        uri,
        transforms = ?pipeline.uris(),
        bytes = pre_digest.len(),
        "reference digested"
    );
    if ctx.debug {
        trace!(uri, "pre-digest data:\n{}", String::from_utf8_lossy(&pre_digest));
    }

    Ok(ReferenceDigest {
        uri: uri.to_owned(),
        digest_method: digest_method.to_owned(),
        pre_digest,
        digest,
    })
}

/// Digest the element with ID `id`, dropping the `occurrence`-th signature
/// below it when given.  No `Reference` element is needed.
pub fn element_digest(
    ctx: &DsigContext,
    doc: &Document<'_>,
    id: &str,
    occurrence: Option<usize>,
    c14n_method: &str,
    digest_method: &str,
) -> Result<ReferenceDigest, Error> {
    let mode = C14nMode::from_uri(c14n_method)
        .ok_or_else(|| Error::UnsupportedAlgorithm(format!("C14N: {c14n_method}")))?;
    let mut pipeline = TransformPipeline::new();
    if let Some(n) = occurrence {
        pipeline.push(Box::new(EnvelopedSignatureTransform::for_occurrence(n)));
    }
    pipeline.push(Box::new(C14nTransform::new(mode, Vec::new())));

    let uri = format!("#{id}");
    let ids = ctx.id_map(doc);
    let pre_digest = pipeline.execute(resolve_uri(&uri, doc, &ids)?)?.to_binary()?;
    let digest = digest::digest(digest_method, &pre_digest)?;
    Ok(ReferenceDigest {
        uri,
        digest_method: digest_method.to_owned(),
        pre_digest,
        digest,
    })
}

/// Build the transform chain listed under `Reference/Transforms`.
fn read_transforms(
    doc: &Document<'_>,
    reference: NodeId,
    signature: NodeId,
) -> Result<TransformPipeline, Error> {
    let mut pipeline = TransformPipeline::new();
    let Some(transforms) = doc.first_child_element_by_name_ns(reference, ns::DSIG, ns::node::TRANSFORMS) else {
        return Ok(pipeline);
    };
    for node in doc.child_elements_by_name_ns(transforms, ns::DSIG, ns::node::TRANSFORM) {
        let uri = doc
            .attribute(node, ns::attr::ALGORITHM)
            .ok_or_else(|| Error::MissingAttribute("Algorithm on Transform".into()))?;
        let transform: Box<dyn Transform> = match uri {
            algorithm::ENVELOPED_SIGNATURE => {
                Box::new(EnvelopedSignatureTransform::for_signature(signature))
            }
            algorithm::BASE64 => Box::new(Base64DecodeTransform),
            _ => {
                let mode = C14nMode::from_uri(uri)
                    .ok_or_else(|| Error::UnsupportedAlgorithm(format!("transform: {uri}")))?;
                Box::new(C14nTransform::new(mode, read_inclusive_prefixes(doc, node)))
            }
        };
        pipeline.push(transform);
    }
    Ok(pipeline)
}

/// The `Algorithm` attribute of the child `local_name` of `parent`.
pub(crate) fn algorithm_of<'d>(
    doc: &'d Document<'_>,
    parent: NodeId,
    local_name: &str,
) -> Result<&'d str, Error> {
    let node = doc
        .first_child_element_by_name_ns(parent, ns::DSIG, local_name)
        .ok_or_else(|| Error::MissingElement(local_name.into()))?;
    doc.attribute(node, ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute(format!("Algorithm on {local_name}")))
}

/// `InclusiveNamespaces/@PrefixList` under a C14N method element.
pub(crate) fn read_inclusive_prefixes(doc: &Document<'_>, method: NodeId) -> Vec<String> {
    doc.first_child_element_by_name_ns(method, ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|n| doc.attribute(n, ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = concat!(
        r##"<xml xmlns:p="urn:p"><a ID="bar"><p:content>bar</p:content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#"/>"##,
        r##"<Signature xmlns="http://www.w3.org/2000/09/xmldsig#"><SignedInfo><Reference URI="#bar"><Transforms>"##,
        r##"<Transform Algorithm="http://www.w3.org/2000/09/xmldsig#enveloped-signature"/>"##,
        r##"<Transform Algorithm="http://www.w3.org/2001/10/xml-exc-c14n#"><InclusiveNamespaces xmlns="http://www.w3.org/2001/10/xml-exc-c14n#" PrefixList="p"/></Transform>"##,
        r##"</Transforms><DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/><DigestValue/></Reference></SignedInfo></Signature></a></xml>"##,
    );

    fn parts(doc: &Document<'_>) -> (NodeId, NodeId) {
        let sig = *doc.get_elements_by_tag_name_ns(ns::DSIG, ns::node::SIGNATURE).last().unwrap();
        let reference = doc.find_element(ns::DSIG, ns::node::REFERENCE).unwrap();
        (sig, reference)
    }

    #[test]
    fn test_reference_pre_digest() {
        let doc = ulriksdal_xml::parse(DOC).unwrap();
        let (sig, reference) = parts(&doc);
        let rd = reference_digest(&DsigContext::default(), &doc, sig, reference).unwrap();
        assert_eq!(rd.uri, "#bar");
        assert_eq!(
            String::from_utf8(rd.pre_digest.clone()).unwrap(),
            r#"<a xmlns:p="urn:p" ID="bar"><p:content>bar</p:content><Signature xmlns="http://www.w3.org/2000/09/xmldsig#"></Signature></a>"#
        );
        assert_eq!(rd.digest, digest::digest(algorithm::SHA256, &rd.pre_digest).unwrap());
        assert_eq!(rd.digest_base64().len(), 44);
    }

    #[test]
    fn test_element_digest_matches_reference() {
        let doc = ulriksdal_xml::parse(DOC).unwrap();
        let (sig, reference) = parts(&doc);
        let ctx = DsigContext::default();
        let from_reference = reference_digest(&ctx, &doc, sig, reference).unwrap();
        let direct =
            element_digest(&ctx, &doc, "bar", Some(2), algorithm::C14N, algorithm::SHA256).unwrap();
        // inclusive C14N renders the inherited p binding the same way here
        assert_eq!(direct.pre_digest, from_reference.pre_digest);
        let without =
            element_digest(&ctx, &doc, "bar", None, algorithm::C14N, algorithm::SHA256).unwrap();
        assert_ne!(without.digest, direct.digest);
        assert!(element_digest(&ctx, &doc, "bar", Some(3), algorithm::C14N, algorithm::SHA256).is_err());
    }

    #[test]
    fn test_unknown_transform() {
        let xml = DOC.replace(
            "http://www.w3.org/2001/10/xml-exc-c14n#\"><Inclusive",
            "http://www.w3.org/TR/1999/REC-xpath-19991116\"><Inclusive",
        );
        let doc = ulriksdal_xml::parse(&xml).unwrap();
        let (sig, reference) = parts(&doc);
        let err = reference_digest(&DsigContext::default(), &doc, sig, reference).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }
}
