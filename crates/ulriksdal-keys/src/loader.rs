#![forbid(unsafe_code)]

//! Key loading from PEM, DER and raw binary.

use std::path::Path;

use tracing::debug;
use ulriksdal_core::Error;

use crate::key::{Key, KeyData, KeyUsage};

/// Load an RSA private key from PEM data.
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_text(pem_data)?;

    // Try PKCS#8 first
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(rsa_private(pk));
    }

    // Try PKCS#1
    use pkcs1::DecodeRsaPrivateKey;
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(rsa_private(pk))
}

/// Load an RSA public key from PEM data.
pub fn load_rsa_public_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePublicKey;
    let pem_str = pem_text(pem_data)?;

    // Try SPKI first
    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_pem(pem_str) {
        return Ok(rsa_public(pk));
    }

    // Try PKCS#1
    use pkcs1::DecodeRsaPublicKey;
    let pk = rsa::RsaPublicKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?;
    Ok(rsa_public(pk))
}

/// Load an EC private key (P-256 or P-384) from PKCS#8 or SEC1 PEM.
pub fn load_ec_private_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_text(pem_data)?;

    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_pem(pem_str) {
        return Ok(p256_private(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_pem(pem_str) {
        return Ok(p384_private(sk));
    }
    if let Ok(secret) = p256::SecretKey::from_sec1_pem(pem_str) {
        return Ok(p256_private(p256::ecdsa::SigningKey::from(secret)));
    }
    if let Ok(secret) = p384::SecretKey::from_sec1_pem(pem_str) {
        return Ok(p384_private(p384::ecdsa::SigningKey::from(secret)));
    }
    Err(Error::Key("failed to parse EC private key PEM (tried P-256, P-384)".into()))
}

/// Load an EC public key (P-256 or P-384) from SPKI PEM.
pub fn load_ec_public_pem(pem_data: &[u8]) -> Result<Key, Error> {
    use pkcs8::DecodePublicKey;
    let pem_str = pem_text(pem_data)?;

    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_pem(pem_str) {
        return Ok(Key::new(KeyData::EcP256 { private: None, public: vk }, KeyUsage::Verify));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_pem(pem_str) {
        return Ok(Key::new(KeyData::EcP384 { private: None, public: vk }, KeyUsage::Verify));
    }
    Err(Error::Key("failed to parse EC public key PEM (tried P-256, P-384)".into()))
}

/// Load an HMAC key from raw binary data.
pub fn load_hmac_key(data: &[u8]) -> Key {
    Key::new(KeyData::Hmac(data.to_vec()), KeyUsage::Any)
}

/// Auto-detect key format and load from PEM data.
///
/// Tries RSA private, RSA public, EC private, EC public in order.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<Key, Error> {
    if let Ok(key) = load_rsa_private_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_rsa_public_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_ec_private_pem(pem_data) {
        return Ok(key);
    }
    if let Ok(key) = load_ec_public_pem(pem_data) {
        return Ok(key);
    }
    Err(Error::Key("unable to auto-detect key format from PEM data".into()))
}

/// Auto-detect key format and load from DER data.
///
/// Tries PKCS#8 private keys, SPKI public keys, then PKCS#1 RSA keys.
pub fn load_der_auto(der: &[u8]) -> Result<Key, Error> {
    use pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
    use pkcs8::{DecodePrivateKey, DecodePublicKey};

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(rsa_private(pk));
    }
    if let Ok(sk) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(p256_private(sk));
    }
    if let Ok(sk) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(p384_private(sk));
    }
    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(der) {
        return Ok(rsa_public(pk));
    }
    if let Ok(vk) = p256::ecdsa::VerifyingKey::from_public_key_der(der) {
        return Ok(Key::new(KeyData::EcP256 { private: None, public: vk }, KeyUsage::Verify));
    }
    if let Ok(vk) = p384::ecdsa::VerifyingKey::from_public_key_der(der) {
        return Ok(Key::new(KeyData::EcP384 { private: None, public: vk }, KeyUsage::Verify));
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(der) {
        return Ok(rsa_private(pk));
    }
    if let Ok(pk) = rsa::RsaPublicKey::from_pkcs1_der(der) {
        return Ok(rsa_public(pk));
    }
    Err(Error::Key("unable to auto-detect key format from DER data".into()))
}

/// Load a key from a file, choosing PEM or DER by content.
pub fn load_key_file(path: &Path) -> Result<Key, Error> {
    let data = std::fs::read(path)?;
    let is_pem = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| data[start..].starts_with(b"-----BEGIN"));
    debug!(path = %path.display(), pem = is_pem, "loading key file");
    if is_pem {
        load_pem_auto(&data)
    } else {
        load_der_auto(&data)
    }
}

fn pem_text(pem_data: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(pem_data)
        .map(str::trim)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))
}

fn rsa_private(pk: rsa::RsaPrivateKey) -> Key {
    let public = pk.to_public_key();
    Key::new(KeyData::Rsa { private: Some(pk), public }, KeyUsage::Any)
}

fn rsa_public(pk: rsa::RsaPublicKey) -> Key {
    Key::new(KeyData::Rsa { private: None, public: pk }, KeyUsage::Verify)
}

fn p256_private(sk: p256::ecdsa::SigningKey) -> Key {
    let public = *sk.verifying_key();
    Key::new(KeyData::EcP256 { private: Some(sk), public }, KeyUsage::Any)
}

fn p384_private(sk: p384::ecdsa::SigningKey) -> Key {
    let public = *sk.verifying_key();
    Key::new(KeyData::EcP384 { private: Some(sk), public }, KeyUsage::Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSA_PKCS8: &str = include_str!("../../../test-data/keys/rsa-2048.pem");
    const RSA_PKCS1: &str = include_str!("../../../test-data/keys/rsa-2048-pkcs1.pem");
    const RSA_SPKI: &str = include_str!("../../../test-data/keys/rsa-2048-pub.pem");
    const EC_PKCS8: &str = include_str!("../../../test-data/keys/ec-p256.pem");
    const EC_SEC1: &str = include_str!("../../../test-data/keys/ec-p256-sec1.pem");
    const EC_SPKI: &str = include_str!("../../../test-data/keys/ec-p256-pub.pem");

    #[test]
    fn test_rsa_formats() {
        let a = load_pem_auto(RSA_PKCS8.as_bytes()).unwrap();
        let b = load_pem_auto(RSA_PKCS1.as_bytes()).unwrap();
        let public = load_pem_auto(RSA_SPKI.as_bytes()).unwrap();
        assert!(a.data.has_private() && b.data.has_private());
        assert!(!public.data.has_private());
        assert_eq!(public.usage, KeyUsage::Verify);
        match (&a.data, &public.data) {
            (KeyData::Rsa { public: p1, .. }, KeyData::Rsa { public: p2, .. }) => assert_eq!(p1, p2),
            _ => panic!("expected RSA keys"),
        }
    }

    #[test]
    fn test_ec_formats() {
        for pem in [EC_PKCS8, EC_SEC1] {
            let key = load_pem_auto(pem.as_bytes()).unwrap();
            assert!(matches!(key.data, KeyData::EcP256 { private: Some(_), .. }));
        }
        let key = load_pem_auto(EC_SPKI.as_bytes()).unwrap();
        assert!(matches!(key.data, KeyData::EcP256 { private: None, .. }));
    }

    #[test]
    fn test_der_formats() {
        let ec = load_der_auto(include_bytes!("../../../test-data/keys/ec-p256.der")).unwrap();
        assert!(matches!(ec.data, KeyData::EcP256 { private: Some(_), .. }));
        let rsa = load_der_auto(include_bytes!("../../../test-data/keys/rsa-2048-pub.der")).unwrap();
        assert!(matches!(rsa.data, KeyData::Rsa { private: None, .. }));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(load_pem_auto(b"not a key"), Err(Error::Key(_))));
        assert!(matches!(load_der_auto(&[0x30, 0x03, 0x02, 0x01, 0x00]), Err(Error::Key(_))));
    }

    #[test]
    fn test_hmac_key() {
        let key = load_hmac_key(b"secret");
        assert_eq!(key.algorithm_name(), "HMAC");
    }
}
