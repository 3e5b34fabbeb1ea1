//! Confluence content API types.

use serde::Deserialize;

use d2c_sync::{PageId, RemotePageRef};

/// Confluence page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// Page ID.
    pub id: String,
    /// Page title.
    pub title: String,
    /// Version information.
    pub version: Version,
    /// Page body content.
    #[serde(default)]
    pub body: Option<Body>,
    /// Ancestors from the space root down to the direct parent.
    #[serde(default)]
    pub ancestors: Vec<Ancestor>,
    /// Hypermedia links.
    #[serde(rename = "_links", default)]
    pub links: Option<Links>,
}

impl Page {
    /// Direct parent page id.
    pub fn parent_id(&self) -> Option<&str> {
        self.ancestors.last().map(|ancestor| ancestor.id.as_str())
    }

    /// Storage format body, empty if it was not expanded.
    pub fn storage_value(&self) -> &str {
        self.body
            .as_ref()
            .and_then(|body| body.storage.as_ref())
            .map_or("", |storage| storage.value.as_str())
    }
}

impl From<Page> for RemotePageRef {
    fn from(page: Page) -> Self {
        let parent_id = page.parent_id().map(PageId::new);
        let body = page.storage_value().to_owned();
        Self {
            id: PageId::new(page.id),
            version: page.version.number,
            title: page.title,
            parent_id,
            body,
        }
    }
}

/// Page version.
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    /// Version number.
    pub number: u32,
}

/// Page body content.
#[derive(Debug, Clone, Deserialize)]
pub struct Body {
    /// Storage format content.
    #[serde(default)]
    pub storage: Option<Storage>,
}

/// Storage format representation.
#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    /// XHTML content in Confluence storage format.
    pub value: String,
}

/// Ancestor page reference.
#[derive(Debug, Clone, Deserialize)]
pub struct Ancestor {
    /// Page ID.
    pub id: String,
}

/// Hypermedia links.
#[derive(Debug, Clone, Deserialize)]
pub struct Links {
    /// Web UI link, relative to the base URL.
    #[serde(default)]
    pub webui: Option<String>,
}

/// Content search response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentResults {
    /// Matching pages.
    #[serde(default)]
    pub results: Vec<Page>,
}
