#![forbid(unsafe_code)]

//! Key management for the Ulriksdal XML-DSig library.
//!
//! Loads RSA and EC keys from PEM or DER (PKCS#8, PKCS#1, SEC1, SPKI) and
//! HMAC secrets from raw bytes, and provides a `KeysManager` for lookup by
//! `KeyName` or by signature method.

pub mod key;
pub mod loader;
pub mod manager;

pub use key::{Key, KeyData, KeyUsage};
pub use manager::KeysManager;
