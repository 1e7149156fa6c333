#![forbid(unsafe_code)]

//! Transform pipeline engine for the Ulriksdal XML-DSig library.
//!
//! Implements the transform chain model from XML-DSig: each reference
//! contains a sequence of transforms that are applied in order to the node
//! set its URI selects.

pub mod base64_transform;
pub mod enveloped;
pub mod pipeline;
pub mod uri;

pub use enveloped::{
    occurrence_index, signature_occurrences, EnvelopedSignatureTransform, SignatureTarget,
};
pub use pipeline::{C14nTransform, Transform, TransformData, TransformPipeline};
