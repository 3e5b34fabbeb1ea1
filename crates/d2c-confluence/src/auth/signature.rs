//! OAuth 1.0 RSA-SHA1 request signatures (RFC 5849).

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_encode};
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;

/// OAuth unreserved characters: A-Z a-z 0-9 - . _ ~
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode per RFC 3986.
///
/// Also used for query values so that the signed form and the sent form
/// agree byte for byte.
pub(crate) fn oauth_encode(input: &str) -> String {
    percent_encode(input.as_bytes(), OAUTH_ENCODE_SET).to_string()
}

/// Random nonce, 32 hex characters.
fn generate_nonce() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

fn generate_timestamp() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
        .to_string()
}

fn sign_rsa_sha1(private_key: &RsaPrivateKey, data: &str) -> String {
    let signing_key = SigningKey::<Sha1>::new(private_key.clone());
    let signature = signing_key.sign(data.as_bytes());
    BASE64_STANDARD.encode(signature.to_bytes())
}

/// Signature base string, `METHOD&encoded_base_url&encoded_parameters`.
fn build_signature_base_string(
    method: &str,
    base_url: &str,
    params: &BTreeMap<String, String>,
) -> String {
    let param_string = params
        .iter()
        .map(|(k, v)| format!("{}={}", oauth_encode(k), oauth_encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        oauth_encode(base_url),
        oauth_encode(&param_string)
    )
}

fn build_authorization_header(oauth_params: &BTreeMap<String, String>) -> String {
    let parts: Vec<String> = oauth_params
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", oauth_encode(v)))
        .collect();
    format!("OAuth {}", parts.join(", "))
}

/// Credentials that sign every request.
pub(crate) struct Credentials<'a> {
    pub consumer_key: &'a str,
    pub access_token: &'a str,
    pub private_key: &'a RsaPrivateKey,
}

/// `Authorization` header value for one request.
///
/// `query_params` must be decoded; they are re-encoded for the signature.
pub(crate) fn create_authorization_header(
    method: &str,
    base_url: &str,
    query_params: &[(String, String)],
    credentials: &Credentials<'_>,
) -> String {
    authorization_header_with(
        method,
        base_url,
        query_params,
        credentials,
        generate_nonce(),
        generate_timestamp(),
    )
}

fn authorization_header_with(
    method: &str,
    base_url: &str,
    query_params: &[(String, String)],
    credentials: &Credentials<'_>,
    nonce: String,
    timestamp: String,
) -> String {
    let mut oauth_params = BTreeMap::new();
    oauth_params.insert(
        "oauth_consumer_key".to_owned(),
        credentials.consumer_key.to_owned(),
    );
    oauth_params.insert("oauth_nonce".to_owned(), nonce);
    oauth_params.insert("oauth_signature_method".to_owned(), "RSA-SHA1".to_owned());
    oauth_params.insert("oauth_timestamp".to_owned(), timestamp);
    oauth_params.insert("oauth_token".to_owned(), credentials.access_token.to_owned());
    oauth_params.insert("oauth_version".to_owned(), "1.0".to_owned());

    let mut signature_params = oauth_params.clone();
    for (key, value) in query_params {
        signature_params.insert(key.clone(), value.clone());
    }

    let base_string = build_signature_base_string(method, base_url, &signature_params);
    let signature = sign_rsa_sha1(credentials.private_key, &base_string);
    oauth_params.insert("oauth_signature".to_owned(), signature);

    build_authorization_header(&oauth_params)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;

    use super::*;
    use crate::auth::key::load_private_key;
    use crate::auth::key::tests::TEST_PKCS1_KEY;

    #[test]
    fn test_oauth_encode() {
        assert_eq!(oauth_encode("hello"), "hello");
        assert_eq!(oauth_encode("hello world"), "hello%20world");
        assert_eq!(oauth_encode("a+b=c&d"), "a%2Bb%3Dc%26d");
        assert_eq!(oauth_encode("-._~"), "-._~");
        assert_eq!(oauth_encode("Überblick"), "%C3%9Cberblick");
    }

    #[test]
    fn test_nonce_is_hex() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), 32);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(nonce, generate_nonce());
    }

    #[test]
    fn test_signature_base_string() {
        let mut params = BTreeMap::new();
        params.insert("title".to_owned(), "Getting Started".to_owned());
        params.insert("oauth_nonce".to_owned(), "abc".to_owned());

        let base = build_signature_base_string(
            "get",
            "https://wiki.example.com/rest/api/content",
            &params,
        );
        assert_eq!(
            base,
            "GET&https%3A%2F%2Fwiki.example.com%2Frest%2Fapi%2Fcontent\
             &oauth_nonce%3Dabc%26title%3DGetting%2520Started"
        );
    }

    #[test]
    fn test_authorization_header_verifies() {
        let key = load_private_key(TEST_PKCS1_KEY.as_bytes()).unwrap();
        let credentials = Credentials {
            consumer_key: "d2c",
            access_token: "token",
            private_key: &key,
        };
        let query = [("spaceKey".to_owned(), "DOCS".to_owned())];
        let header = authorization_header_with(
            "GET",
            "https://wiki.example.com/rest/api/content",
            &query,
            &credentials,
            "nonce".to_owned(),
            "1700000000".to_owned(),
        );

        assert!(header.starts_with("OAuth oauth_consumer_key=\"d2c\", oauth_nonce=\"nonce\""));
        assert!(header.contains("oauth_signature_method=\"RSA-SHA1\""));
        assert!(!header.contains("spaceKey"));

        let encoded = header
            .split("oauth_signature=\"")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap();
        let decoded = percent_encoding::percent_decode_str(encoded)
            .decode_utf8()
            .unwrap();
        let raw = BASE64_STANDARD.decode(decoded.as_bytes()).unwrap();

        let mut params = BTreeMap::new();
        for (k, v) in [
            ("oauth_consumer_key", "d2c"),
            ("oauth_nonce", "nonce"),
            ("oauth_signature_method", "RSA-SHA1"),
            ("oauth_timestamp", "1700000000"),
            ("oauth_token", "token"),
            ("oauth_version", "1.0"),
            ("spaceKey", "DOCS"),
        ] {
            params.insert(k.to_owned(), v.to_owned());
        }
        let base = build_signature_base_string(
            "GET",
            "https://wiki.example.com/rest/api/content",
            &params,
        );

        let verifying_key = VerifyingKey::<Sha1>::new(key.to_public_key());
        let signature = Signature::try_from(raw.as_slice()).unwrap();
        verifying_key.verify(base.as_bytes(), &signature).unwrap();
    }
}
