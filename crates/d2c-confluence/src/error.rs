//! Error types for the Confluence client.

use d2c_sync::RemoteError;

/// Error from Confluence API operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfluenceError {
    /// Request did not produce a response (network error, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Request(#[from] ureq::Error),

    /// Server returned an error status.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Request URL could not be built.
    #[error("invalid URL {url}: {message}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Parser diagnostic.
        message: String,
    },

    /// RSA key loading or parsing failed.
    #[error("RSA key error: {0}")]
    RsaKey(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConfluenceError> for RemoteError {
    fn from(err: ConfluenceError) -> Self {
        match err {
            ConfluenceError::Http {
                status: 401,
                body,
            } => RemoteError::Auth(if body.is_empty() {
                "401 Unauthorized".to_owned()
            } else {
                body
            }),
            ConfluenceError::Http { status, body } => RemoteError::Http { status, body },
            ConfluenceError::Request(e) => RemoteError::Transport(e.to_string()),
            ConfluenceError::RsaKey(message) => RemoteError::Auth(message),
            err @ (ConfluenceError::Json(_) | ConfluenceError::InvalidUrl { .. }) => {
                RemoteError::Decode(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_maps_to_remote_http() {
        let err = ConfluenceError::Http {
            status: 500,
            body: "oops".to_owned(),
        };
        assert_eq!(
            RemoteError::from(err),
            RemoteError::Http {
                status: 500,
                body: "oops".to_owned()
            }
        );
    }

    #[test]
    fn test_unauthorized_maps_to_auth() {
        let err = ConfluenceError::Http {
            status: 401,
            body: String::new(),
        };
        assert_eq!(
            RemoteError::from(err),
            RemoteError::Auth("401 Unauthorized".to_owned())
        );
    }

    #[test]
    fn test_json_error_maps_to_decode() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let remote = RemoteError::from(ConfluenceError::from(json_err));
        assert!(matches!(remote, RemoteError::Decode(_)));
    }
}
