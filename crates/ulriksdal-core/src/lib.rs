#![forbid(unsafe_code)]

//! Core types shared by every Ulriksdal crate: algorithm URIs, XML-DSig
//! namespace and element names, and the common error type.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
