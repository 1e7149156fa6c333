#![forbid(unsafe_code)]

//! Message digests named by `DigestMethod/@Algorithm`.

use digest::Digest;
use ulriksdal_core::{algorithm, Error};

/// A hash function usable as a reference digest or an ECDSA prehash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestMethod {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl DigestMethod {
    pub const ALL: [DigestMethod; 9] = [
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|m| m.uri() == uri)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("digest algorithm: {uri}")))
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::SHA1,
            Self::Sha224 => algorithm::SHA224,
            Self::Sha256 => algorithm::SHA256,
            Self::Sha384 => algorithm::SHA384,
            Self::Sha512 => algorithm::SHA512,
            Self::Sha3_224 => algorithm::SHA3_224,
            Self::Sha3_256 => algorithm::SHA3_256,
            Self::Sha3_384 => algorithm::SHA3_384,
            Self::Sha3_512 => algorithm::SHA3_512,
        }
    }

    /// Hash `data` in one pass.
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha1 => hash_with::<sha1::Sha1>(data),
            Self::Sha224 => hash_with::<sha2::Sha224>(data),
            Self::Sha256 => hash_with::<sha2::Sha256>(data),
            Self::Sha384 => hash_with::<sha2::Sha384>(data),
            Self::Sha512 => hash_with::<sha2::Sha512>(data),
            Self::Sha3_224 => hash_with::<sha3::Sha3_224>(data),
            Self::Sha3_256 => hash_with::<sha3::Sha3_256>(data),
            Self::Sha3_384 => hash_with::<sha3::Sha3_384>(data),
            Self::Sha3_512 => hash_with::<sha3::Sha3_512>(data),
        }
    }
}

fn hash_with<D: Digest>(data: &[u8]) -> Vec<u8> {
    D::digest(data).to_vec()
}

/// Hash `data` with the algorithm named by `uri`.
pub fn digest(uri: &str, data: &[u8]) -> Result<Vec<u8>, Error> {
    Ok(DigestMethod::from_uri(uri)?.hash(data))
}

/// Every supported digest URI.
pub const SUPPORTED: &[&str] = &[
    algorithm::SHA1,
    algorithm::SHA224,
    algorithm::SHA256,
    algorithm::SHA384,
    algorithm::SHA512,
    algorithm::SHA3_224,
    algorithm::SHA3_256,
    algorithm::SHA3_384,
    algorithm::SHA3_512,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_sha256() {
        let result = digest(algorithm::SHA256, b"hello").unwrap();
        assert_eq!(
            hex(&result),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_output_lengths() {
        let expected = [20, 28, 32, 48, 64, 28, 32, 48, 64];
        for (method, len) in DigestMethod::ALL.into_iter().zip(expected) {
            assert_eq!(method.hash(b"abc").len(), len, "{}", method.uri());
        }
    }

    #[test]
    fn test_supported_list_matches_methods() {
        let uris: Vec<&str> = DigestMethod::ALL.into_iter().map(DigestMethod::uri).collect();
        assert_eq!(uris, SUPPORTED);
        for uri in SUPPORTED {
            assert_eq!(DigestMethod::from_uri(uri).unwrap().uri(), *uri);
        }
    }

    #[test]
    fn test_unknown_uri() {
        assert!(matches!(
            digest("urn:nope", b""),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }
}
