//! In-memory remote for testing.
//!
//! Provides [`MockRemote`], a page store with Confluence semantics: titles are
//! unique per space, creates need an existing parent, and updates must carry
//! the page's current version.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::RemoteError;
use crate::remote::{PageVersion, RemotePageRef, RemotePages};
use crate::tree::PageId;

/// Remote operation kind, used for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// `get_page`.
    Get,
    /// `create_page`.
    Create,
    /// `update_page`.
    Update,
}

/// One call received by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    /// Title lookup.
    GetPage {
        /// Space searched.
        space: String,
        /// Title searched.
        title: String,
    },
    /// Page creation.
    CreatePage {
        /// Target space.
        space: String,
        /// Requested parent.
        parent_id: Option<PageId>,
        /// New page title.
        title: String,
    },
    /// Page update.
    UpdatePage {
        /// Target page.
        page_id: PageId,
        /// Version supplied by the caller.
        version: u32,
        /// Requested new parent.
        parent_id: Option<PageId>,
    },
}

#[derive(Debug, Clone)]
struct MockPage {
    space: String,
    title: String,
    parent_id: Option<PageId>,
    body: String,
    version: u32,
}

#[derive(Debug)]
struct Failure {
    error: RemoteError,
    remaining: Option<usize>,
}

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<PageId, MockPage>,
    next_id: u64,
    calls: Vec<RemoteCall>,
    failures: HashMap<(RemoteOp, String), Failure>,
}

impl MockState {
    fn find(&self, space: &str, title: &str) -> Option<(&PageId, &MockPage)> {
        self.pages
            .iter()
            .find(|(_, page)| page.space == space && page.title == title)
    }

    fn allocate_id(&mut self) -> PageId {
        self.next_id += 1;
        PageId::new((1000 + self.next_id).to_string())
    }

    fn take_failure(&mut self, op: RemoteOp, title: &str) -> Option<RemoteError> {
        let key = (op, title.to_owned());
        let failure = self.failures.get_mut(&key)?;
        let error = failure.error.clone();
        if let Some(remaining) = failure.remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.failures.remove(&key);
            }
        }
        Some(error)
    }
}

/// Mock remote for testing.
///
/// Records every call and can be told to fail specific operations by page
/// title.
///
/// # Example
///
/// ```ignore
/// use d2c_sync::{MockRemote, RemoteError};
///
/// let remote = MockRemote::new();
/// let home = remote.insert_page("DOCS", "Home", None, "<p>hi</p>");
/// remote.fail_create("Guide", RemoteError::Http { status: 500, body: String::new() });
/// ```
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
}

impl MockRemote {
    /// Create an empty remote.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page at version 1 and return its id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert_page(
        &self,
        space: &str,
        title: &str,
        parent_id: Option<&PageId>,
        body: &str,
    ) -> PageId {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id();
        state.pages.insert(
            id.clone(),
            MockPage {
                space: space.to_owned(),
                title: title.to_owned(),
                parent_id: parent_id.cloned(),
                body: body.to_owned(),
                version: 1,
            },
        );
        id
    }

    /// Replace a page's body as a concurrent editor would, bumping its version.
    ///
    /// # Panics
    ///
    /// Panics if the page does not exist or the internal lock is poisoned.
    pub fn set_body(&self, page_id: &PageId, body: &str) {
        let mut state = self.state.lock().unwrap();
        let page = state.pages.get_mut(page_id).unwrap();
        page.body = body.to_owned();
        page.version += 1;
    }

    /// Remove a page.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_page(&self, page_id: &PageId) {
        self.state.lock().unwrap().pages.remove(page_id);
    }

    /// Snapshot of a page by title.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page_by_title(&self, space: &str, title: &str) -> Option<RemotePageRef> {
        let state = self.state.lock().unwrap();
        state.find(space, title).map(|(id, page)| snapshot(id, page))
    }

    /// Number of pages stored.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.state.lock().unwrap().pages.len()
    }

    /// Calls received so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Forget recorded calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Fail every `op` call for `title` with `error`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_on(&self, op: RemoteOp, title: &str, error: RemoteError) {
        self.insert_failure(op, title, error, None);
    }

    /// Fail the next `times` calls of `op` for `title` with `error`.
    ///
    /// # Panics
    ///
    /// Panics if `times` is zero or the internal lock is poisoned.
    pub fn fail_times(&self, op: RemoteOp, title: &str, error: RemoteError, times: usize) {
        assert!(times > 0, "times must be positive");
        self.insert_failure(op, title, error, Some(times));
    }

    /// Fail every lookup of `title`.
    pub fn fail_get(&self, title: &str, error: RemoteError) {
        self.fail_on(RemoteOp::Get, title, error);
    }

    /// Fail every creation of `title`.
    pub fn fail_create(&self, title: &str, error: RemoteError) {
        self.fail_on(RemoteOp::Create, title, error);
    }

    /// Fail every update of `title`.
    pub fn fail_update(&self, title: &str, error: RemoteError) {
        self.fail_on(RemoteOp::Update, title, error);
    }

    fn insert_failure(
        &self,
        op: RemoteOp,
        title: &str,
        error: RemoteError,
        remaining: Option<usize>,
    ) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((op, title.to_owned()), Failure { error, remaining });
    }
}

fn snapshot(id: &PageId, page: &MockPage) -> RemotePageRef {
    RemotePageRef {
        id: id.clone(),
        version: page.version,
        title: page.title.clone(),
        parent_id: page.parent_id.clone(),
        body: page.body.clone(),
    }
}

fn not_found(page_id: &PageId) -> RemoteError {
    RemoteError::Http {
        status: 404,
        body: format!("no content with id {page_id}"),
    }
}

impl RemotePages for MockRemote {
    fn get_page(&self, space: &str, title: &str) -> Result<Option<RemotePageRef>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RemoteCall::GetPage {
            space: space.to_owned(),
            title: title.to_owned(),
        });
        if let Some(error) = state.take_failure(RemoteOp::Get, title) {
            return Err(error);
        }
        Ok(state.find(space, title).map(|(id, page)| snapshot(id, page)))
    }

    fn create_page(
        &self,
        space: &str,
        parent_id: Option<&PageId>,
        title: &str,
        body: &str,
    ) -> Result<PageVersion, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RemoteCall::CreatePage {
            space: space.to_owned(),
            parent_id: parent_id.cloned(),
            title: title.to_owned(),
        });
        if let Some(error) = state.take_failure(RemoteOp::Create, title) {
            return Err(error);
        }
        if let Some(parent) = parent_id
            && !state.pages.contains_key(parent)
        {
            return Err(not_found(parent));
        }
        if state.find(space, title).is_some() {
            return Err(RemoteError::Http {
                status: 400,
                body: format!("a page with title '{title}' already exists in space {space}"),
            });
        }

        let id = state.allocate_id();
        state.pages.insert(
            id.clone(),
            MockPage {
                space: space.to_owned(),
                title: title.to_owned(),
                parent_id: parent_id.cloned(),
                body: body.to_owned(),
                version: 1,
            },
        );
        Ok(PageVersion { id, version: 1 })
    }

    fn update_page(
        &self,
        page_id: &PageId,
        version: u32,
        title: &str,
        body: &str,
        parent_id: Option<&PageId>,
    ) -> Result<PageVersion, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RemoteCall::UpdatePage {
            page_id: page_id.clone(),
            version,
            parent_id: parent_id.cloned(),
        });
        if let Some(error) = state.take_failure(RemoteOp::Update, title) {
            return Err(error);
        }
        if let Some(parent) = parent_id
            && !state.pages.contains_key(parent)
        {
            return Err(not_found(parent));
        }

        let page = state
            .pages
            .get_mut(page_id)
            .ok_or_else(|| not_found(page_id))?;
        if page.version != version {
            return Err(RemoteError::VersionConflict {
                page_id: page_id.clone(),
            });
        }

        page.version += 1;
        page.title = title.to_owned();
        page.body = body.to_owned();
        if let Some(parent) = parent_id {
            page.parent_id = Some(parent.clone());
        }
        Ok(PageVersion {
            id: page_id.clone(),
            version: page.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_get() {
        let remote = MockRemote::new();
        let created = remote.create_page("DOCS", None, "Home", "<p>x</p>").unwrap();

        let page = remote.get_page("DOCS", "Home").unwrap().unwrap();

        assert_eq!(page.id, created.id);
        assert_eq!(page.version, 1);
        assert_eq!(page.body, "<p>x</p>");
    }

    #[test]
    fn test_create_requires_existing_parent() {
        let remote = MockRemote::new();
        let err = remote
            .create_page("DOCS", Some(&PageId::new("404")), "Child", "")
            .unwrap_err();
        assert!(matches!(err, RemoteError::Http { status: 404, .. }));
    }

    #[test]
    fn test_update_checks_version() {
        let remote = MockRemote::new();
        let id = remote.insert_page("DOCS", "Home", None, "a");

        let stale = remote.update_page(&id, 7, "Home", "b", None).unwrap_err();
        assert_eq!(stale, RemoteError::VersionConflict { page_id: id.clone() });

        let updated = remote.update_page(&id, 1, "Home", "b", None).unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(remote.page_by_title("DOCS", "Home").unwrap().body, "b");
    }

    #[test]
    fn test_fail_times_expires() {
        let remote = MockRemote::new();
        remote.fail_times(
            RemoteOp::Get,
            "Home",
            RemoteError::Transport("reset".to_owned()),
            1,
        );

        assert!(remote.get_page("DOCS", "Home").is_err());
        assert_eq!(remote.get_page("DOCS", "Home").unwrap(), None);
        assert_eq!(remote.calls().len(), 2);
    }
}
