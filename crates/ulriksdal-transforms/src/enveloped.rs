#![forbid(unsafe_code)]

//! Enveloped signature transform.
//!
//! Removes one `<Signature>` element, and everything below it, from the
//! node set of the reference being processed.  The signature is located by
//! its occurrence index: its 1-based rank among the `ds:Signature`
//! descendants of the reference target, in document order.  The index is
//! computed from the document passed to [`Transform::execute`] every time
//! the transform runs and is never stored, so a transform built while
//! signing one tree gives the right answer on a reparsed copy of it.

use tracing::debug;
use ulriksdal_core::{algorithm, ns, Error};
use ulriksdal_xml::{Document, DocumentExt, NodeId};

use crate::pipeline::{Transform, TransformData};

/// All `ds:Signature` elements strictly below `scope`, in document order.
pub fn signature_occurrences(doc: &Document<'_>, scope: NodeId) -> Vec<NodeId> {
    doc.descendants(scope)
        .into_iter()
        .filter(|id| doc.has_name(*id, ns::DSIG, ns::node::SIGNATURE))
        .collect()
}

/// The 1-based occurrence index of `signature` among the signatures below
/// `scope`.  A signature outside `scope` is an error.
pub fn occurrence_index(doc: &Document<'_>, scope: NodeId, signature: NodeId) -> Result<usize, Error> {
    signature_occurrences(doc, scope)
        .iter()
        .position(|id| *id == signature)
        .map(|pos| pos + 1)
        .ok_or_else(|| {
            Error::Transform(format!(
                "signature node {} is not a Signature below the reference target",
                signature.index()
            ))
        })
}

/// Which signature the enveloped transform removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureTarget {
    /// The signature element itself, in the document being processed.
    Node(NodeId),
    /// An explicit 1-based occurrence index within the reference target.
    Occurrence(usize),
}

/// The enveloped signature transform.
#[derive(Debug, Clone)]
pub struct EnvelopedSignatureTransform {
    target: SignatureTarget,
}

impl EnvelopedSignatureTransform {
    pub fn new(target: SignatureTarget) -> Self {
        Self { target }
    }

    /// Remove the given signature element.
    pub fn for_signature(signature: NodeId) -> Self {
        Self::new(SignatureTarget::Node(signature))
    }

    /// Remove the `n`-th signature (1-based) below the reference target.
    pub fn for_occurrence(n: usize) -> Self {
        Self::new(SignatureTarget::Occurrence(n))
    }

    pub fn target(&self) -> SignatureTarget {
        self.target
    }

    /// Resolve the target to an element of `doc` below `scope`.
    pub fn locate(&self, doc: &Document<'_>, scope: NodeId) -> Result<(usize, NodeId), Error> {
        let occurrences = signature_occurrences(doc, scope);
        let index = match self.target {
            SignatureTarget::Node(signature) => occurrences
                .iter()
                .position(|id| *id == signature)
                .map(|pos| pos + 1)
                .ok_or_else(|| {
                    Error::Transform(format!(
                        "signature node {} is not a Signature below the reference target",
                        signature.index()
                    ))
                })?,
            SignatureTarget::Occurrence(n) => n,
        };
        let node = index
            .checked_sub(1)
            .and_then(|i| occurrences.get(i))
            .copied()
            .ok_or_else(|| {
                Error::Transform(format!(
                    "signature occurrence {index} does not exist: the reference target holds {} signature(s)",
                    occurrences.len()
                ))
            })?;
        debug!(
            occurrence = index,
            total = occurrences.len(),
            scope = scope.index(),
            "enveloped signature occurrence"
        );
        Ok((index, node))
    }
}

impl Transform for EnvelopedSignatureTransform {
    fn uri(&self) -> &str {
        algorithm::ENVELOPED_SIGNATURE
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        match input {
            TransformData::Xml {
                doc,
                root,
                mut node_set,
            } => {
                let (_, signature) = self.locate(doc, root)?;
                node_set.remove_subtree(doc, signature);
                Ok(TransformData::Xml { doc, root, node_set })
            }
            TransformData::Binary(_) => Err(Error::Transform(
                "enveloped-signature transform requires XML input".into(),
            )),
        }
    }
}
