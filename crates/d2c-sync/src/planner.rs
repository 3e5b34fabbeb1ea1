//! Per-node reconciliation of local content against the remote page.

use std::borrow::Cow;

use crate::convert::{Converter, convert_node};
use crate::error::ConversionError;
use crate::markup;
use crate::remote::RemotePageRef;
use crate::tree::{DocumentNode, PageId};

/// Remote change to apply for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Page does not exist yet.
    Create {
        /// Parent page, `None` for the space root.
        parent_id: Option<PageId>,
        /// Page title.
        title: String,
        /// Storage-format body.
        markup: String,
    },
    /// Page exists with different content or under a different parent.
    Update {
        /// Existing page.
        page_id: PageId,
        /// Version read when planning.
        version: u32,
        /// Page title.
        title: String,
        /// New storage-format body.
        markup: String,
        /// New parent when the page must move.
        move_to: Option<PageId>,
    },
    /// Page is already up to date.
    Skip {
        /// Existing page.
        page_id: PageId,
    },
}

impl SyncAction {
    /// Short lowercase name for logs and reports.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Skip { .. } => "skip",
        }
    }
}

/// Decide the action for `node`.
///
/// `parent_id` is the page the node belongs under; `existing` is the resolver
/// result for the node's title.
///
/// # Errors
///
/// Returns [`ConversionError`] if the node's content cannot be converted.
pub fn plan<C: Converter + ?Sized>(
    node: &DocumentNode,
    parent_id: Option<&PageId>,
    existing: Option<&RemotePageRef>,
    converter: &C,
) -> Result<SyncAction, ConversionError> {
    let markup = convert_node(converter, node)?;

    let Some(page) = existing else {
        return Ok(SyncAction::Create {
            parent_id: parent_id.cloned(),
            title: node.title.clone(),
            markup,
        });
    };

    let move_to = parent_id
        .filter(|expected| page.parent_id.as_ref() != Some(*expected))
        .cloned();

    if move_to.is_none() && markup_eq(&markup, &page.body) {
        return Ok(SyncAction::Skip {
            page_id: page.id.clone(),
        });
    }

    Ok(SyncAction::Update {
        page_id: page.id.clone(),
        version: page.version,
        title: node.title.clone(),
        markup,
        move_to,
    })
}

/// Compare converted markup with a stored body.
///
/// Bodies are compared in canonical form, so the server's re-serialization
/// of a page (decoded entities, `ac:macro-id` attributes, empty element
/// shape) does not count as a change. Line endings and surrounding
/// whitespace are not significant. Markup that does not parse falls back to
/// a plain text comparison.
#[must_use]
pub fn markup_eq(local: &str, remote: &str) -> bool {
    match (markup::canonical(local), markup::canonical(remote)) {
        (Some(local), Some(remote)) => local == remote,
        _ => normalize(local) == normalize(remote),
    }
}

fn normalize(markup: &str) -> Cow<'_, str> {
    let trimmed = markup.trim();
    if trimmed.contains('\r') {
        Cow::Owned(trimmed.replace("\r\n", "\n"))
    } else {
        Cow::Borrowed(trimmed)
    }
}
