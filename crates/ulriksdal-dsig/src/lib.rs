#![forbid(unsafe_code)]

//! XML Digital Signature (XML-DSig) implementation.
//!
//! Creates and verifies enveloped signatures.  The enveloped-signature
//! transform locates its own `Signature` by occurrence index within the
//! reference target, computed on the tree being processed, so a signature
//! on any of several signed siblings verifies both in memory and after a
//! serialize/reparse round trip.

pub mod context;
pub mod options;
pub mod reference;
pub mod selector;
pub mod sign;
pub mod verify;

pub use context::DsigContext;
pub use options::SignatureOptions;
pub use reference::{element_digest, reference_digest, ReferenceDigest};
pub use selector::SignatureSelector;
pub use sign::{sign, sign_xml};
pub use verify::{verify, verify_xml, InvalidReason, VerifyResult};
