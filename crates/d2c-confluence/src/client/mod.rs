//! Confluence REST API client.
//!
//! Blocking HTTP client for the Confluence content API. Works against
//! Confluence Cloud (basic auth with an API token) and Server/Data Center
//! (OAuth 1.0 RSA-SHA1).

mod pages;

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use ureq::Agent;
use ureq::http::{Response, Uri};

use crate::auth::Auth;
use crate::auth::key::read_private_key;
use crate::error::ConfluenceError;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Confluence REST API client.
pub struct ConfluenceClient {
    agent: Agent,
    base_url: String,
    auth: Auth,
}

impl ConfluenceClient {
    /// Create a client for `base_url` (for Cloud, include the `/wiki` path).
    #[must_use]
    pub fn new(base_url: &str, auth: Auth) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth,
        }
    }

    /// Client with basic auth.
    #[must_use]
    pub fn with_basic_auth(base_url: &str, username: &str, api_token: &str) -> Self {
        Self::new(base_url, Auth::basic(username, api_token))
    }

    /// Client with OAuth 1.0, reading the private key from a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::RsaKey`] if the key cannot be read or parsed.
    pub fn with_oauth(
        base_url: &str,
        consumer_key: &str,
        key_file: &Path,
        access_token: &str,
    ) -> Result<Self, ConfluenceError> {
        let private_key = read_private_key(key_file)?;
        Ok(Self::new(
            base_url,
            Auth::oauth(consumer_key, private_key, access_token),
        ))
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self) -> String {
        format!("{}/rest/api", self.base_url)
    }

    /// Browser URL of a page.
    pub fn page_url(&self, page_id: &str) -> String {
        format!("{}/pages/viewpage.action?pageId={page_id}", self.base_url)
    }

    fn authorization(&self, method: &str, url: &str) -> Result<String, ConfluenceError> {
        let uri: Uri = url.parse().map_err(|e: ureq::http::uri::InvalidUri| {
            ConfluenceError::InvalidUrl {
                url: url.to_owned(),
                message: e.to_string(),
            }
        })?;
        Ok(self.auth.header(method, &uri))
    }

    /// GET `url` and decode the JSON response.
    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ConfluenceError> {
        let authorization = self.authorization("GET", url)?;
        let response = self
            .agent
            .get(url)
            .header("Authorization", &authorization)
            .header("Accept", "application/json")
            .call()?;
        read_json(response)
    }

    /// POST or PUT a JSON payload and decode the JSON response.
    fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<T, ConfluenceError> {
        let authorization = self.authorization(method.as_str(), url)?;
        let body = serde_json::to_vec(payload)?;
        let request = match method {
            Method::Post => self.agent.post(url),
            Method::Put => self.agent.put(url),
        };
        let response = request
            .header("Authorization", &authorization)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .send(&body[..])?;
        read_json(response)
    }
}

impl std::fmt::Debug for ConfluenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfluenceClient")
            .field("base_url", &self.base_url)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Post,
    Put,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

fn read_json<T: DeserializeOwned>(response: Response<ureq::Body>) -> Result<T, ConfluenceError> {
    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| "(unable to read error body)".to_owned());
        return Err(ConfluenceError::Http {
            status,
            body: error_body,
        });
    }

    let text = body.read_to_string()?;
    Ok(serde_json::from_str(&text)?)
}
