//! Remote page capability and title-based page resolution.

use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::tree::PageId;

/// Snapshot of a remote page.
///
/// May already be stale by the time a write is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePageRef {
    /// Page id.
    pub id: PageId,
    /// Current version number.
    pub version: u32,
    /// Page title.
    pub title: String,
    /// Direct parent page, `None` for a space root page.
    pub parent_id: Option<PageId>,
    /// Stored body in storage format.
    pub body: String,
}

/// Id and version returned by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVersion {
    /// Page id.
    pub id: PageId,
    /// Version after the write.
    pub version: u32,
}

/// Page operations the engine needs from the remote wiki.
pub trait RemotePages: Send + Sync {
    /// Look up a page by title within a space.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] on transport or server failure. A missing page
    /// is `Ok(None)`, never an error.
    fn get_page(&self, space: &str, title: &str) -> Result<Option<RemotePageRef>, RemoteError>;

    /// Create a page under `parent_id` (or at the space root).
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the page cannot be created.
    fn create_page(
        &self,
        space: &str,
        parent_id: Option<&PageId>,
        title: &str,
        body: &str,
    ) -> Result<PageVersion, RemoteError>;

    /// Replace a page's body.
    ///
    /// `version` is the caller's known current version. When `parent_id` is
    /// set the page is also moved under that parent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::VersionConflict`] if `version` is stale, other
    /// [`RemoteError`] variants on failure.
    fn update_page(
        &self,
        page_id: &PageId,
        version: u32,
        title: &str,
        body: &str,
        parent_id: Option<&PageId>,
    ) -> Result<PageVersion, RemoteError>;
}

impl<T: RemotePages + ?Sized> RemotePages for &T {
    fn get_page(&self, space: &str, title: &str) -> Result<Option<RemotePageRef>, RemoteError> {
        (**self).get_page(space, title)
    }

    fn create_page(
        &self,
        space: &str,
        parent_id: Option<&PageId>,
        title: &str,
        body: &str,
    ) -> Result<PageVersion, RemoteError> {
        (**self).create_page(space, parent_id, title, body)
    }

    fn update_page(
        &self,
        page_id: &PageId,
        version: u32,
        title: &str,
        body: &str,
        parent_id: Option<&PageId>,
    ) -> Result<PageVersion, RemoteError> {
        (**self).update_page(page_id, version, title, body, parent_id)
    }
}

/// Finds the remote counterpart of a document within one space.
pub struct Resolver<'a, R: ?Sized> {
    remote: &'a R,
    space: &'a str,
}

impl<'a, R: RemotePages + ?Sized> Resolver<'a, R> {
    /// Create a resolver for `space`.
    pub fn new(remote: &'a R, space: &'a str) -> Self {
        Self { remote, space }
    }

    /// Space key this resolver searches.
    #[must_use]
    pub fn space(&self) -> &str {
        self.space
    }

    /// Resolve a page by title, passing the expected parent as context.
    ///
    /// Titles are unique per space, so a page found under another parent is
    /// still returned; the mismatch is logged and left for the planner.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the lookup itself fails.
    pub fn resolve(
        &self,
        title: &str,
        parent_id: Option<&PageId>,
    ) -> Result<Option<RemotePageRef>, RemoteError> {
        let page = self.remote.get_page(self.space, title)?;

        match &page {
            Some(found) => {
                if let Some(expected) = parent_id
                    && found.parent_id.as_ref() != Some(expected)
                {
                    warn!(
                        "Page '{}' (id={}) is under {:?}, expected parent {}",
                        title,
                        found.id,
                        found.parent_id.as_ref().map(PageId::as_str),
                        expected
                    );
                }
                debug!("Resolved '{}' to page {} v{}", title, found.id, found.version);
            }
            None => debug!("No page titled '{}' in space {}", title, self.space),
        }

        Ok(page)
    }

    /// Re-read a page after a version conflict.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError`] if the lookup fails.
    pub fn refresh(&self, title: &str) -> Result<Option<RemotePageRef>, RemoteError> {
        self.remote.get_page(self.space, title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRemote;

    #[test]
    fn test_resolve_not_found() {
        let remote = MockRemote::new();
        let resolver = Resolver::new(&remote, "DOCS");
        assert_eq!(resolver.resolve("Missing", None).unwrap(), None);
    }

    #[test]
    fn test_resolve_found_under_other_parent() {
        let remote = MockRemote::new();
        let elsewhere = remote.insert_page("DOCS", "Elsewhere", None, "");
        let page = remote.insert_page("DOCS", "Guide", Some(&elsewhere), "<p>g</p>");

        let resolver = Resolver::new(&remote, "DOCS");
        let found = resolver
            .resolve("Guide", Some(&PageId::new("999")))
            .unwrap()
            .unwrap();

        assert_eq!(found.id, page);
        assert_eq!(found.parent_id, Some(elsewhere));
        assert_eq!(found.body, "<p>g</p>");
    }

    #[test]
    fn test_resolve_scoped_to_space() {
        let remote = MockRemote::new();
        remote.insert_page("OTHER", "Guide", None, "");
        let resolver = Resolver::new(&remote, "DOCS");
        assert_eq!(resolver.resolve("Guide", None).unwrap(), None);
    }

    #[test]
    fn test_resolve_error_is_not_not_found() {
        let remote = MockRemote::new();
        remote.fail_get("Guide", RemoteError::Transport("connection reset".to_owned()));
        let resolver = Resolver::new(&remote, "DOCS");

        let err = resolver.resolve("Guide", None).unwrap_err();

        assert_eq!(err, RemoteError::Transport("connection reset".to_owned()));
    }
}
