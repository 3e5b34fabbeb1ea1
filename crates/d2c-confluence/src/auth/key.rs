//! RSA private key loading for OAuth request signing.

use std::path::Path;

use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;

use crate::error::ConfluenceError;

/// Read and parse an RSA private key from a PEM file.
///
/// # Errors
///
/// Returns [`ConfluenceError::RsaKey`] if the file cannot be read or parsed.
pub fn read_private_key(path: impl AsRef<Path>) -> Result<RsaPrivateKey, ConfluenceError> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        ConfluenceError::RsaKey(format!("failed to read key file {}: {e}", path.display()))
    })?;
    load_private_key(&data)
}

/// Parse an RSA private key from PEM bytes.
///
/// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`).
///
/// # Errors
///
/// Returns [`ConfluenceError::RsaKey`] if neither format parses.
pub fn load_private_key(pem: &[u8]) -> Result<RsaPrivateKey, ConfluenceError> {
    let pem = std::str::from_utf8(pem)
        .map_err(|e| ConfluenceError::RsaKey(format!("invalid UTF-8 in key: {e}")))?;

    if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(pem) {
        return Ok(key);
    }

    RsaPrivateKey::from_pkcs1_pem(pem)
        .map_err(|e| ConfluenceError::RsaKey(format!("failed to parse PEM key: {e}")))
}
