//! [`RemotePages`] over the Confluence REST API.

use d2c_sync::{PageId, PageVersion, RemoteError, RemotePageRef, RemotePages};

use crate::client::ConfluenceClient;
use crate::error::ConfluenceError;
use crate::types::Page;

impl RemotePages for ConfluenceClient {
    fn get_page(&self, space: &str, title: &str) -> Result<Option<RemotePageRef>, RemoteError> {
        let page = self.find_page_by_title(space, title)?;
        Ok(page.map(RemotePageRef::from))
    }

    fn create_page(
        &self,
        space: &str,
        parent_id: Option<&PageId>,
        title: &str,
        body: &str,
    ) -> Result<PageVersion, RemoteError> {
        let page = ConfluenceClient::create_page(
            self,
            space,
            parent_id.map(PageId::as_str),
            title,
            body,
        )?;
        Ok(page_version(page))
    }

    fn update_page(
        &self,
        page_id: &PageId,
        version: u32,
        title: &str,
        body: &str,
        parent_id: Option<&PageId>,
    ) -> Result<PageVersion, RemoteError> {
        ConfluenceClient::update_page(
            self,
            page_id.as_str(),
            version,
            title,
            body,
            parent_id.map(PageId::as_str),
        )
        .map(page_version)
        .map_err(|err| update_error(page_id, err))
    }
}

fn page_version(page: Page) -> PageVersion {
    PageVersion {
        id: PageId::new(page.id),
        version: page.version.number,
    }
}

/// HTTP 409 on update means the known version is stale.
fn update_error(page_id: &PageId, err: ConfluenceError) -> RemoteError {
    match err {
        ConfluenceError::Http { status: 409, .. } => RemoteError::VersionConflict {
            page_id: page_id.clone(),
        },
        other => other.into(),
    }
}
