#![forbid(unsafe_code)]

//! Choosing which `<Signature>` element of a document to verify.

use ulriksdal_core::{ns, Error};
use ulriksdal_transforms::signature_occurrences;
use ulriksdal_xml::{Document, IdMap, NodeId};

/// Selects the `Signature` element a verification runs against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignatureSelector {
    /// The first signature in document order that has a `SignedInfo`.
    #[default]
    First,
    /// The `n`-th (1-based) `Signature` element of the whole document,
    /// placeholders included.
    Occurrence(usize),
    /// The single signature with a `SignedInfo` that is a direct child of
    /// the element with this ID.
    ChildOf(String),
}

impl SignatureSelector {
    /// Resolve the selector against `doc`.
    pub fn select(&self, doc: &Document<'_>, ids: &IdMap) -> Result<NodeId, Error> {
        match self {
            Self::First => signature_occurrences(doc, doc.root())
                .into_iter()
                .find(|sig| has_signed_info(doc, *sig))
                .ok_or_else(|| Error::MissingElement("Signature with SignedInfo".into())),
            Self::Occurrence(n) => {
                let all = signature_occurrences(doc, doc.root());
                n.checked_sub(1)
                    .and_then(|i| all.get(i))
                    .copied()
                    .ok_or_else(|| {
                        Error::MissingElement(format!(
                            "Signature occurrence {n}: the document holds {}",
                            all.len()
                        ))
                    })
            }
            Self::ChildOf(id) => {
                let parent = ids.resolve(id)?;
                let candidates: Vec<NodeId> = doc
                    .child_elements_by_name_ns(parent, ns::DSIG, ns::node::SIGNATURE)
                    .into_iter()
                    .filter(|sig| has_signed_info(doc, *sig))
                    .collect();
                match candidates.as_slice() {
                    [] => Err(Error::MissingElement(format!(
                        "Signature with SignedInfo under #{id}"
                    ))),
                    [sig] => Ok(*sig),
                    many => Err(Error::XmlStructure(format!(
                        "#{id} carries {} signatures",
                        many.len()
                    ))),
                }
            }
        }
    }
}

fn has_signed_info(doc: &Document<'_>, sig: NodeId) -> bool {
    doc.first_child_element_by_name_ns(sig, ns::DSIG, ns::node::SIGNED_INFO)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

    fn doc() -> Document<'static> {
        let xml = format!(
            r#"<xml><a ID="foo"><Signature xmlns="{DSIG}"/></a><a ID="bar"><Signature xmlns="{DSIG}"/><Signature xmlns="{DSIG}"><SignedInfo/></Signature></a><a ID="two"><Signature xmlns="{DSIG}"><SignedInfo/></Signature><Signature xmlns="{DSIG}"><SignedInfo/></Signature></a></xml>"#
        );
        ulriksdal_xml::parse_bytes(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_first_skips_placeholders() {
        let doc = doc();
        let ids = IdMap::build(&doc, ns::DEFAULT_ID_ATTRS);
        let first = SignatureSelector::First.select(&doc, &ids).unwrap();
        assert_eq!(first, SignatureSelector::Occurrence(3).select(&doc, &ids).unwrap());
    }

    #[test]
    fn test_child_of() {
        let doc = doc();
        let ids = IdMap::build(&doc, ns::DEFAULT_ID_ATTRS);
        let bar = SignatureSelector::ChildOf("bar".into()).select(&doc, &ids).unwrap();
        assert_eq!(bar, SignatureSelector::Occurrence(3).select(&doc, &ids).unwrap());
        assert!(matches!(
            SignatureSelector::ChildOf("foo".into()).select(&doc, &ids),
            Err(Error::MissingElement(_))
        ));
        assert!(matches!(
            SignatureSelector::ChildOf("two".into()).select(&doc, &ids),
            Err(Error::XmlStructure(_))
        ));
    }

    #[test]
    fn test_occurrence_out_of_range() {
        let doc = doc();
        let ids = IdMap::build(&doc, ns::DEFAULT_ID_ATTRS);
        assert!(SignatureSelector::Occurrence(0).select(&doc, &ids).is_err());
        assert!(SignatureSelector::Occurrence(5).select(&doc, &ids).is_ok());
        assert!(SignatureSelector::Occurrence(6).select(&doc, &ids).is_err());
    }
}
