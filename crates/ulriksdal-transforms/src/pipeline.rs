#![forbid(unsafe_code)]

//! Transform pipeline and trait definitions.

use ulriksdal_c14n::C14nMode;
use ulriksdal_core::Error;
use ulriksdal_xml::{Document, NodeId, NodeSet};

/// Data flowing through the transform pipeline.
pub enum TransformData<'a> {
    /// A node set over a borrowed document.  `root` is the node the
    /// reference URI selected: the document node for `""`, the element for
    /// `#id`.
    Xml {
        doc: &'a Document<'a>,
        root: NodeId,
        node_set: NodeSet,
    },
    /// Raw binary data.
    Binary(Vec<u8>),
}

impl TransformData<'_> {
    /// Convert to binary, canonicalizing a node set with inclusive C14N.
    pub fn to_binary(&self) -> Result<Vec<u8>, Error> {
        match self {
            TransformData::Binary(data) => Ok(data.clone()),
            TransformData::Xml { doc, node_set, .. } => {
                ulriksdal_c14n::canonicalize(doc, C14nMode::Inclusive, Some(node_set), &[])
            }
        }
    }

    pub fn is_xml(&self) -> bool {
        matches!(self, TransformData::Xml { .. })
    }
}

/// Trait for individual transforms.
pub trait Transform: Send + Sync {
    /// The algorithm URI for this transform.
    fn uri(&self) -> &str;

    /// Execute the transform on the given data.
    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error>;
}

/// A pipeline of transforms executed in sequence.
#[derive(Default)]
pub struct TransformPipeline {
    transforms: Vec<Box<dyn Transform>>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transform to the pipeline.
    pub fn push(&mut self, transform: Box<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Execute all transforms in order.
    pub fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let mut data = input;
        for transform in &self.transforms {
            data = transform.execute(data)?;
        }
        Ok(data)
    }

    /// Algorithm URIs of the transforms, in order.
    pub fn uris(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.uri()).collect()
    }

    /// Number of transforms in the pipeline.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

// ── C14N Transform ───────────────────────────────────────────────────

/// A canonicalization transform.
pub struct C14nTransform {
    mode: C14nMode,
    inclusive_prefixes: Vec<String>,
}

impl C14nTransform {
    pub fn new(mode: C14nMode, inclusive_prefixes: Vec<String>) -> Self {
        Self {
            mode,
            inclusive_prefixes,
        }
    }
}

impl Transform for C14nTransform {
    fn uri(&self) -> &str {
        self.mode.uri()
    }

    fn execute<'a>(&self, input: TransformData<'a>) -> Result<TransformData<'a>, Error> {
        let bytes = match input {
            TransformData::Xml { doc, node_set, .. } => ulriksdal_c14n::canonicalize(
                doc,
                self.mode,
                Some(&node_set),
                &self.inclusive_prefixes,
            )?,
            TransformData::Binary(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| Error::Transform(format!("invalid UTF-8: {e}")))?;
                ulriksdal_c14n::canonicalize_xml(text, self.mode, &self.inclusive_prefixes)?
            }
        };
        Ok(TransformData::Binary(bytes))
    }
}
