#![forbid(unsafe_code)]

//! Cryptographic algorithm implementations for the Ulriksdal XML-DSig
//! library: message digests and signature methods, looked up by the
//! algorithm URIs that appear in `DigestMethod` and `SignatureMethod`.

pub mod digest;
pub mod sign;

pub use digest::DigestMethod;
pub use sign::{KeyFamily, SignatureAlgorithm, SigningKey};
