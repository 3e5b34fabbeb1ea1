//! In-memory document tree and per-run remote id slots.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Remote page ids
//! assigned during a run are kept apart from the tree in [`RemoteIds`], so the
//! tree itself stays immutable while the engine walks it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Remote page identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(String);

impl PageId {
    /// Create a page id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Index of a node within its [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A local document or directory that maps to one remote page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentNode {
    /// Path relative to the source root (empty for the root node).
    pub path: PathBuf,
    /// Page title, unique within the tree.
    pub title: String,
    /// Markdown body, `None` for a container directory.
    pub raw_content: Option<String>,
    /// Parent node, `None` for the root.
    pub parent: Option<NodeId>,
    /// Children in listing order.
    pub children: Vec<NodeId>,
}

impl DocumentNode {
    /// True if this node only anchors children and has no content of its own.
    #[must_use]
    pub fn is_container(&self) -> bool {
        self.raw_content.is_none()
    }
}

/// Arena of document nodes rooted at [`DocumentTree::root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    nodes: Vec<DocumentNode>,
}

impl DocumentTree {
    /// Create a tree holding only a root node.
    #[must_use]
    pub fn new(title: impl Into<String>, raw_content: Option<String>) -> Self {
        Self {
            nodes: vec![DocumentNode {
                path: PathBuf::new(),
                title: title.into(),
                raw_content,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Append a child under `parent` and return its id.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        path: impl Into<PathBuf>,
        title: impl Into<String>,
        raw_content: Option<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DocumentNode {
            path: path.into(),
            title: title.into(),
            raw_content,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Root node id.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Node by id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &DocumentNode {
        &self.nodes[id.0]
    }

    /// Node by id, `None` for ids from another tree.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&DocumentNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids in parent-before-child order.
    #[must_use]
    pub fn pre_order(&self) -> Vec<NodeId> {
        self.subtree(self.root())
    }

    /// Ids of `id` and all its descendants, parent before child.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }

    /// Find a node by its relative path.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.path == path)
            .map(NodeId)
    }
}

/// Sync state of one node's remote page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncSlot {
    /// Not yet created or matched in this run.
    Unsynced,
    /// Bound to a remote page.
    Synced(PageId),
}

/// Remote page ids assigned to nodes during one run.
///
/// Each slot is written at most once; later writes are rejected.
#[derive(Debug)]
pub struct RemoteIds {
    slots: Vec<OnceLock<PageId>>,
}

impl RemoteIds {
    /// Create unsynced slots for every node of `tree`.
    #[must_use]
    pub fn for_tree(tree: &DocumentTree) -> Self {
        Self {
            slots: (0..tree.len()).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Current state of a node's slot.
    #[must_use]
    pub fn get(&self, id: NodeId) -> SyncSlot {
        match self.page_id(id) {
            Some(page_id) => SyncSlot::Synced(page_id.clone()),
            None => SyncSlot::Unsynced,
        }
    }

    /// Assigned page id, if any.
    #[must_use]
    pub fn page_id(&self, id: NodeId) -> Option<&PageId> {
        self.slots.get(id.0).and_then(OnceLock::get)
    }

    /// Bind a node to a page.
    ///
    /// # Errors
    ///
    /// Returns the rejected id if the slot was already assigned or the node is unknown.
    pub fn assign(&self, id: NodeId, page_id: PageId) -> Result<(), PageId> {
        match self.slots.get(id.0) {
            Some(slot) => slot.set(page_id),
            None => Err(page_id),
        }
    }

    /// Number of synced slots.
    #[must_use]
    pub fn synced_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }
}
