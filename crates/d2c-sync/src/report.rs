//! Per-node outcomes and run summary.

use std::path::PathBuf;

use crate::error::NodeError;
use crate::tree::{NodeId, PageId, RemoteIds};

/// What happened to one node during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Page was created.
    Created {
        /// New page.
        page_id: PageId,
    },
    /// Page was updated.
    Updated {
        /// Updated page.
        page_id: PageId,
        /// Version after the update.
        version: u32,
    },
    /// Page was already current.
    Skipped {
        /// Matched page.
        page_id: PageId,
    },
    /// Node failed; its subtree is blocked.
    Failed(NodeError),
    /// Not attempted because an ancestor failed.
    Blocked {
        /// Path of the failed ancestor.
        ancestor: PathBuf,
    },
    /// Not attempted because the run stopped early.
    Cancelled,
}

impl NodeOutcome {
    /// Page bound to the node, if it synced.
    #[must_use]
    pub fn page_id(&self) -> Option<&PageId> {
        match self {
            Self::Created { page_id } | Self::Updated { page_id, .. } | Self::Skipped { page_id } => {
                Some(page_id)
            }
            Self::Failed(_) | Self::Blocked { .. } | Self::Cancelled => None,
        }
    }

    /// Short lowercase label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Skipped { .. } => "skipped",
            Self::Failed(_) => "failed",
            Self::Blocked { .. } => "blocked",
            Self::Cancelled => "cancelled",
        }
    }

    /// True if the node ended bound to a remote page.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.page_id().is_some()
    }
}

/// Outcome of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    /// Node in the synced tree.
    pub node: NodeId,
    /// Path relative to the source root.
    pub path: PathBuf,
    /// Page title.
    pub title: String,
    /// What happened.
    pub outcome: NodeOutcome,
}

/// Outcome counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub blocked: usize,
    pub cancelled: usize,
}

impl Summary {
    fn record(&mut self, outcome: &NodeOutcome) {
        match outcome {
            NodeOutcome::Created { .. } => self.created += 1,
            NodeOutcome::Updated { .. } => self.updated += 1,
            NodeOutcome::Skipped { .. } => self.skipped += 1,
            NodeOutcome::Failed(_) => self.failed += 1,
            NodeOutcome::Blocked { .. } => self.blocked += 1,
            NodeOutcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Total nodes counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.created + self.updated + self.skipped + self.failed + self.blocked + self.cancelled
    }
}

/// Result of a sync run.
#[derive(Debug)]
pub struct SyncReport {
    /// Node outcomes in pre-order.
    pub nodes: Vec<NodeReport>,
    /// Final remote id of every node.
    pub remote_ids: RemoteIds,
    /// Outcome counts.
    pub summary: Summary,
}

impl SyncReport {
    pub(crate) fn new(nodes: Vec<NodeReport>, remote_ids: RemoteIds) -> Self {
        let mut summary = Summary::default();
        for report in &nodes {
            summary.record(&report.outcome);
        }
        Self {
            nodes,
            remote_ids,
            summary,
        }
    }

    /// True if every node synced.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0 && self.summary.blocked == 0 && self.summary.cancelled == 0
    }

    /// Reports of failed nodes.
    pub fn failures(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes
            .iter()
            .filter(|report| matches!(report.outcome, NodeOutcome::Failed(_)))
    }

    /// Report for the node titled `title`.
    #[must_use]
    pub fn by_title(&self, title: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|report| report.title == title)
    }
}
