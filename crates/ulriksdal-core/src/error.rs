#![forbid(unsafe_code)]

/// Errors produced by the Ulriksdal XML Signature library.
///
/// Verification *outcomes* (digest or signature mismatch, unresolvable
/// references) are not errors; they are reported through the verifier's
/// result type. This enum covers input that cannot be processed at all.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("transform error: {0}")]
    Transform(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("base64 decode error: {0}")]
    Base64(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("invalid URI reference: {0}")]
    InvalidUri(String),

    #[error("ID not found: {0}")]
    IdNotFound(String),

    #[error("ID is not unique: {0}")]
    DuplicateId(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means a same-document reference could not be
    /// resolved to exactly one element.
    pub fn is_reference_resolution(&self) -> bool {
        matches!(
            self,
            Error::IdNotFound(_) | Error::DuplicateId(_) | Error::InvalidUri(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
