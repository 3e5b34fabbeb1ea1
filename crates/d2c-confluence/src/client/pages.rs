//! Page operations for the Confluence API.

use serde_json::{Value, json};
use tracing::{debug, info};

use super::{ConfluenceClient, Method};
use crate::auth::oauth_encode;
use crate::error::ConfluenceError;
use crate::types::{ContentResults, Page};

/// Fields expanded on title lookups.
const PAGE_EXPAND: &str = "body.storage,version,ancestors";

impl ConfluenceClient {
    /// Find a page by exact title within a space.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError`] if the request fails.
    pub fn find_page_by_title(
        &self,
        space_key: &str,
        title: &str,
    ) -> Result<Option<Page>, ConfluenceError> {
        let url = title_search_url(&self.api_url(), space_key, title);
        debug!(space = space_key, title, "Looking up page");

        let results: ContentResults = self.get_json(&url)?;
        Ok(results.results.into_iter().next())
    }

    /// Create a page, under `parent_id` when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError`] if the request fails.
    pub fn create_page(
        &self,
        space_key: &str,
        parent_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content", self.api_url());
        let payload = create_payload(space_key, parent_id, title, body);

        info!("Creating page '{}' in space {}", title, space_key);
        let page: Page = self.send_json(Method::Post, &url, &payload)?;
        info!("Created page {} (version {})", page.id, page.version.number);
        Ok(page)
    }

    /// Replace a page body, bumping its version from `version`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfluenceError::Http`] with status 409 if `version` is no
    /// longer current.
    pub fn update_page(
        &self,
        page_id: &str,
        version: u32,
        title: &str,
        body: &str,
        parent_id: Option<&str>,
    ) -> Result<Page, ConfluenceError> {
        let url = format!("{}/content/{}", self.api_url(), page_id);
        let payload = update_payload(page_id, version, title, body, parent_id);

        info!(
            "Updating page {} from version {} to {}",
            page_id,
            version,
            version + 1
        );
        self.send_json(Method::Put, &url, &payload)
    }
}

fn title_search_url(api_url: &str, space_key: &str, title: &str) -> String {
    format!(
        "{api_url}/content?spaceKey={}&title={}&type=page&expand={PAGE_EXPAND}",
        oauth_encode(space_key),
        oauth_encode(title),
    )
}

fn storage_body(body: &str) -> Value {
    json!({
        "storage": {
            "value": body,
            "representation": "storage"
        }
    })
}

fn create_payload(space_key: &str, parent_id: Option<&str>, title: &str, body: &str) -> Value {
    let mut payload = json!({
        "type": "page",
        "title": title,
        "space": {"key": space_key},
        "body": storage_body(body),
    });
    if let Some(parent_id) = parent_id {
        payload["ancestors"] = json!([{"id": parent_id}]);
    }
    payload
}

fn update_payload(
    page_id: &str,
    version: u32,
    title: &str,
    body: &str,
    parent_id: Option<&str>,
) -> Value {
    let mut payload = json!({
        "id": page_id,
        "type": "page",
        "title": title,
        "body": storage_body(body),
        "version": {"number": version + 1},
    });
    if let Some(parent_id) = parent_id {
        payload["ancestors"] = json!([{"id": parent_id}]);
    }
    payload
}
