//! Request authentication for Confluence.
//!
//! Confluence Cloud takes basic auth with an API token. Server and Data
//! Center installations use OAuth 1.0 with RSA-SHA1 signatures.

pub mod key;
mod signature;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use percent_encoding::percent_decode_str;
use rsa::RsaPrivateKey;
use ureq::http::Uri;

pub(crate) use signature::oauth_encode;
use signature::{Credentials, create_authorization_header};

/// How requests are authenticated.
pub enum Auth {
    /// Precomputed `Basic` header value.
    Basic(String),
    /// OAuth 1.0 RSA-SHA1, signed per request.
    OAuth(OAuth1Auth),
}

impl Auth {
    /// Basic auth from a username (or email) and API token.
    #[must_use]
    pub fn basic(username: &str, api_token: &str) -> Self {
        let encoded = BASE64_STANDARD.encode(format!("{username}:{api_token}"));
        Self::Basic(format!("Basic {encoded}"))
    }

    /// OAuth 1.0 with an already parsed private key.
    #[must_use]
    pub fn oauth(consumer_key: &str, private_key: RsaPrivateKey, access_token: &str) -> Self {
        Self::OAuth(OAuth1Auth {
            consumer_key: consumer_key.to_owned(),
            private_key,
            access_token: access_token.to_owned(),
        })
    }

    /// `Authorization` header value for a request.
    pub(crate) fn header(&self, method: &str, uri: &Uri) -> String {
        match self {
            Self::Basic(header) => header.clone(),
            Self::OAuth(oauth) => oauth.sign(method, uri),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic(_) => f.write_str("Auth::Basic(..)"),
            Self::OAuth(oauth) => f
                .debug_struct("Auth::OAuth")
                .field("consumer_key", &oauth.consumer_key)
                .finish_non_exhaustive(),
        }
    }
}

/// OAuth 1.0 RSA-SHA1 credentials.
pub struct OAuth1Auth {
    consumer_key: String,
    private_key: RsaPrivateKey,
    access_token: String,
}

impl OAuth1Auth {
    fn sign(&self, method: &str, uri: &Uri) -> String {
        // Base URL excludes the query string (RFC 5849 Section 3.4.1.2)
        let base_url = format!(
            "{}://{}{}",
            uri.scheme_str().unwrap_or("https"),
            uri.authority().map_or("", |authority| authority.as_str()),
            uri.path()
        );

        let query_params = uri.query().map(decode_query).unwrap_or_default();

        create_authorization_header(
            method,
            &base_url,
            &query_params,
            &Credentials {
                consumer_key: &self.consumer_key,
                access_token: &self.access_token,
                private_key: &self.private_key,
            },
        )
    }
}

/// Split a raw query string into decoded key/value pairs.
fn decode_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|param| !param.is_empty())
        .map(|param| {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(component: &str) -> String {
    percent_decode_str(component)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::key::load_private_key;
    use crate::auth::key::tests::TEST_PKCS8_KEY;

    #[test]
    fn test_basic_header() {
        let auth = Auth::basic("user@example.com", "secret");
        let uri: Uri = "https://example.atlassian.net/wiki/rest/api/content"
            .parse()
            .unwrap();
        assert_eq!(
            auth.header("GET", &uri),
            "Basic dXNlckBleGFtcGxlLmNvbTpzZWNyZXQ="
        );
    }

    #[test]
    fn test_decode_query() {
        assert_eq!(
            decode_query("spaceKey=DOCS&title=Getting%20Started&expand="),
            vec![
                ("spaceKey".to_owned(), "DOCS".to_owned()),
                ("title".to_owned(), "Getting Started".to_owned()),
                ("expand".to_owned(), String::new()),
            ]
        );
        assert!(decode_query("").is_empty());
    }

    #[test]
    fn test_oauth_header() {
        let key = load_private_key(TEST_PKCS8_KEY.as_bytes()).unwrap();
        let auth = Auth::oauth("d2c", key, "access");
        let uri: Uri = "https://wiki.example.com:8443/rest/api/content?title=A%20B"
            .parse()
            .unwrap();
        let header = auth.header("GET", &uri);
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_token=\"access\""));
        assert!(header.contains("oauth_signature=\""));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let debug = format!("{:?}", Auth::basic("user", "secret"));
        assert!(!debug.contains("secret"));
    }
}
