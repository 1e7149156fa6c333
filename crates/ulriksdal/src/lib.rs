#![forbid(unsafe_code)]

//! Ulriksdal: XML Signature with enveloped signatures that verify no matter
//! how many other signatures the document carries.
//!
//! This crate re-exports the workspace crates under short names.

pub use ulriksdal_c14n as c14n;
pub use ulriksdal_core as core;
pub use ulriksdal_crypto as crypto;
pub use ulriksdal_dsig as dsig;
pub use ulriksdal_keys as keys;
pub use ulriksdal_transforms as transforms;
pub use ulriksdal_xml as xml;
