//! Remote decorator that records writes instead of performing them.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::info;

use crate::error::RemoteError;
use crate::remote::{PageVersion, RemotePageRef, RemotePages};
use crate::tree::PageId;

/// Write that a dry run would have performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedWrite {
    /// Page would be created.
    Create {
        /// Synthetic id handed back to the engine.
        page_id: PageId,
        /// Parent the page would be created under.
        parent_id: Option<PageId>,
        /// Page title.
        title: String,
    },
    /// Page would be updated.
    Update {
        /// Existing page.
        page_id: PageId,
        /// Version the update was based on.
        version: u32,
        /// Page title.
        title: String,
        /// Parent the page would move under.
        move_to: Option<PageId>,
    },
}

/// Passes reads through to `R` and answers writes locally.
///
/// Created pages get synthetic `dry-run-N` ids so their children can still be
/// planned.
#[derive(Debug)]
pub struct DryRunRemote<R> {
    inner: R,
    next_id: AtomicU64,
    writes: Mutex<Vec<PlannedWrite>>,
}

impl<R: RemotePages> DryRunRemote<R> {
    /// Wrap a remote.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            next_id: AtomicU64::new(0),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Writes recorded so far, in call order.
    pub fn writes(&self) -> Vec<PlannedWrite> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Wrapped remote.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    fn record(&self, write: PlannedWrite) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(write);
    }
}

impl<R: RemotePages> RemotePages for DryRunRemote<R> {
    fn get_page(&self, space: &str, title: &str) -> Result<Option<RemotePageRef>, RemoteError> {
        self.inner.get_page(space, title)
    }

    fn create_page(
        &self,
        _space: &str,
        parent_id: Option<&PageId>,
        title: &str,
        _body: &str,
    ) -> Result<PageVersion, RemoteError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let page_id = PageId::new(format!("dry-run-{n}"));
        info!("[dry-run] Would create page '{}'", title);
        self.record(PlannedWrite::Create {
            page_id: page_id.clone(),
            parent_id: parent_id.cloned(),
            title: title.to_owned(),
        });
        Ok(PageVersion {
            id: page_id,
            version: 1,
        })
    }

    fn update_page(
        &self,
        page_id: &PageId,
        version: u32,
        title: &str,
        _body: &str,
        parent_id: Option<&PageId>,
    ) -> Result<PageVersion, RemoteError> {
        info!("[dry-run] Would update page '{}' ({})", title, page_id);
        self.record(PlannedWrite::Update {
            page_id: page_id.clone(),
            version,
            title: title.to_owned(),
            move_to: parent_id.cloned(),
        });
        Ok(PageVersion {
            id: page_id.clone(),
            version: version + 1,
        })
    }
}
