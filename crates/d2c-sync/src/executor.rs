//! Applies planned actions to the remote, parent before child.
//!
//! The engine walks the tree in pre-order. A node is planned only after its
//! parent's slot is synced, so every create names a parent that already
//! exists. A failed node blocks its own subtree and nothing else.
//!
//! With `concurrency > 1`, sibling subtrees run on a dedicated rayon pool.
//! Each subtree still syncs its root before descending, and results are
//! reassembled in pre-order, so reports are identical to a sequential run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::convert::Converter;
use crate::error::{NodeError, RemoteError};
use crate::planner::{SyncAction, plan};
use crate::remote::{RemotePages, Resolver};
use crate::report::{NodeOutcome, NodeReport, SyncReport};
use crate::tree::{DocumentNode, DocumentTree, NodeId, PageId, RemoteIds, SyncSlot};

/// What to do with the rest of the run once a node fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep syncing every subtree that is not blocked.
    #[default]
    Continue,
    /// Stop planning new nodes; remaining nodes are reported cancelled.
    Stop,
}

/// Shared flag that interrupts a run between nodes.
///
/// In-flight remote calls complete; nodes not yet started are reported
/// [`NodeOutcome::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// True once [`cancel`](Self::cancel) was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Target space key.
    pub space_key: String,
    /// Page the tree root is placed under, `None` for the space root.
    pub root_parent: Option<PageId>,
    /// Maximum sibling subtrees synced at once.
    pub concurrency: usize,
    /// Behavior after a node fails.
    pub failure_policy: FailurePolicy,
}

impl SyncOptions {
    /// Sequential run into `space_key` with the `Continue` policy.
    #[must_use]
    pub fn new(space_key: impl Into<String>) -> Self {
        Self {
            space_key: space_key.into(),
            root_parent: None,
            concurrency: 1,
            failure_policy: FailurePolicy::Continue,
        }
    }

    /// Place the tree root under `parent`.
    #[must_use]
    pub fn with_root_parent(mut self, parent: Option<PageId>) -> Self {
        self.root_parent = parent;
        self
    }

    /// Set the maximum parallelism (values below 1 mean 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Synchronizes a [`DocumentTree`] into a remote space.
pub struct SyncEngine<R, C> {
    remote: R,
    converter: C,
    options: SyncOptions,
    cancel: CancelFlag,
}

impl<R: RemotePages, C: Converter> SyncEngine<R, C> {
    /// Create an engine.
    pub fn new(remote: R, converter: C, options: SyncOptions) -> Self {
        Self {
            remote,
            converter,
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Observe `flag` between nodes.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    /// Run configuration.
    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Wrapped remote.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Sync every node of `tree` and report per-node outcomes.
    ///
    /// Never fails as a whole: node failures are recorded in the report.
    pub fn run(&self, tree: &DocumentTree) -> SyncReport {
        info!(
            "Syncing {} pages into space {} (concurrency {})",
            tree.len(),
            self.options.space_key,
            self.options.concurrency
        );

        let remote_ids = RemoteIds::for_tree(tree);
        let nodes = {
            let run = Run {
                remote: &self.remote,
                converter: &self.converter,
                options: &self.options,
                cancel: &self.cancel,
                tree,
                ids: &remote_ids,
                halted: AtomicBool::new(false),
                parallel: self.options.concurrency > 1,
            };
            if run.parallel {
                match rayon::ThreadPoolBuilder::new()
                    .num_threads(self.options.concurrency)
                    .thread_name(|i| format!("d2c-sync-{i}"))
                    .build()
                {
                    Ok(pool) => pool.install(|| run.sync_subtree(tree.root())),
                    Err(e) => {
                        warn!("Failed to create thread pool, syncing sequentially: {}", e);
                        Run {
                            parallel: false,
                            ..run
                        }
                        .sync_subtree(tree.root())
                    }
                }
            } else {
                run.sync_subtree(tree.root())
            }
        };

        let report = SyncReport::new(nodes, remote_ids);
        let summary = &report.summary;
        info!(
            "Sync finished: {} created, {} updated, {} skipped, {} failed, {} blocked, {} cancelled",
            summary.created,
            summary.updated,
            summary.skipped,
            summary.failed,
            summary.blocked,
            summary.cancelled
        );
        report
    }
}

/// State of one run, shared by every worker.
struct Run<'a, R, C> {
    remote: &'a R,
    converter: &'a C,
    options: &'a SyncOptions,
    cancel: &'a CancelFlag,
    tree: &'a DocumentTree,
    ids: &'a RemoteIds,
    halted: AtomicBool,
    parallel: bool,
}

impl<R: RemotePages, C: Converter> Run<'_, R, C> {
    /// Sync `id` and then its children; returns reports in pre-order.
    fn sync_subtree(&self, id: NodeId) -> Vec<NodeReport> {
        let node = self.tree.node(id);

        if self.should_stop() {
            return self.mark_subtree(id, &NodeOutcome::Cancelled);
        }

        let outcome = self.sync_node(id, node);
        let failed = matches!(outcome, NodeOutcome::Failed(_));
        let mut reports = vec![self.report(id, outcome)];

        if failed {
            if self.options.failure_policy == FailurePolicy::Stop {
                warn!("Stopping after failure of {}", node.path.display());
                self.halted.store(true, Ordering::SeqCst);
            }
            let blocked = NodeOutcome::Blocked {
                ancestor: node.path.clone(),
            };
            for child in &node.children {
                reports.extend(self.mark_subtree(*child, &blocked));
            }
        } else if self.parallel && node.children.len() > 1 {
            let children: Vec<Vec<NodeReport>> = node
                .children
                .par_iter()
                .map(|child| self.sync_subtree(*child))
                .collect();
            reports.extend(children.into_iter().flatten());
        } else {
            for child in &node.children {
                reports.extend(self.sync_subtree(*child));
            }
        }

        reports
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.halted.load(Ordering::SeqCst)
    }

    fn mark_subtree(&self, id: NodeId, outcome: &NodeOutcome) -> Vec<NodeReport> {
        self.tree
            .subtree(id)
            .into_iter()
            .map(|node| self.report(node, outcome.clone()))
            .collect()
    }

    fn report(&self, id: NodeId, outcome: NodeOutcome) -> NodeReport {
        let node = self.tree.node(id);
        NodeReport {
            node: id,
            path: node.path.clone(),
            title: node.title.clone(),
            outcome,
        }
    }

    fn sync_node(&self, id: NodeId, node: &DocumentNode) -> NodeOutcome {
        let parent_id = match node.parent {
            None => self.options.root_parent.clone(),
            Some(parent) => match self.ids.get(parent) {
                SyncSlot::Synced(page_id) => Some(page_id),
                SyncSlot::Unsynced => {
                    error!("Parent of {} is not synced", node.path.display());
                    return NodeOutcome::Failed(NodeError::ParentUnsynced(node.path.clone()));
                }
            },
        };

        match self.apply(node, parent_id.as_ref()) {
            Ok(outcome) => {
                if let Some(page_id) = outcome.page_id() {
                    let assigned = self.ids.assign(id, page_id.clone());
                    debug_assert!(assigned.is_ok(), "{} synced twice", node.path.display());
                }
                outcome
            }
            Err(e) => {
                error!("Failed to sync '{}': {}", node.title, e);
                NodeOutcome::Failed(e)
            }
        }
    }

    fn apply(
        &self,
        node: &DocumentNode,
        parent_id: Option<&PageId>,
    ) -> Result<NodeOutcome, NodeError> {
        let resolver = Resolver::new(self.remote, &self.options.space_key);
        let existing = resolver
            .resolve(&node.title, parent_id)
            .map_err(NodeError::Resolve)?;

        match plan(node, parent_id, existing.as_ref(), self.converter)? {
            SyncAction::Create {
                parent_id,
                title,
                markup,
            } => {
                info!(
                    "Creating page '{}' under {}",
                    title,
                    parent_id.as_ref().map_or("space root", PageId::as_str)
                );
                let created = self
                    .remote
                    .create_page(&self.options.space_key, parent_id.as_ref(), &title, &markup)
                    .map_err(NodeError::Create)?;
                Ok(NodeOutcome::Created {
                    page_id: created.id,
                })
            }
            SyncAction::Update {
                page_id,
                version,
                title,
                markup,
                move_to,
            } => self.update(&resolver, &page_id, version, &title, &markup, move_to.as_ref()),
            SyncAction::Skip { page_id } => {
                debug!("Page '{}' ({}) is up to date", node.title, page_id);
                Ok(NodeOutcome::Skipped { page_id })
            }
        }
    }

    /// Update with a single retry on version conflict.
    fn update(
        &self,
        resolver: &Resolver<'_, R>,
        page_id: &PageId,
        version: u32,
        title: &str,
        markup: &str,
        move_to: Option<&PageId>,
    ) -> Result<NodeOutcome, NodeError> {
        match move_to {
            Some(parent) => info!("Updating page '{}' ({}) and moving it under {}", title, page_id, parent),
            None => info!("Updating page '{}' ({}, v{})", title, page_id, version),
        }

        let conflicted = match self
            .remote
            .update_page(page_id, version, title, markup, move_to)
        {
            Ok(updated) => return Ok(updated_outcome(updated.id, updated.version)),
            Err(RemoteError::VersionConflict { .. }) => page_id,
            Err(e) => return Err(NodeError::Update(e)),
        };

        warn!(
            "Version conflict on '{}' ({}, v{}), retrying with fresh version",
            title, conflicted, version
        );
        let fresh = resolver
            .refresh(title)
            .map_err(NodeError::Resolve)?
            .ok_or_else(|| NodeError::Vanished {
                page_id: conflicted.clone(),
            })?;

        match self
            .remote
            .update_page(&fresh.id, fresh.version, title, markup, move_to)
        {
            Ok(updated) => Ok(updated_outcome(updated.id, updated.version)),
            Err(RemoteError::VersionConflict { .. }) => {
                Err(NodeError::VersionConflict { page_id: fresh.id })
            }
            Err(e) => Err(NodeError::Update(e)),
        }
    }
}

fn updated_outcome(page_id: PageId, version: u32) -> NodeOutcome {
    NodeOutcome::Updated { page_id, version }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::error::ConversionError;
    use crate::loader::load;
    use crate::mock::{MockRemote, RemoteCall, RemoteOp};
    use crate::remote::{PageVersion, RemotePageRef};

    const SPACE: &str = "DOCS";

    /// Wraps each trimmed document in a paragraph; `!broken` fails conversion.
    fn to_markup(markdown: &str) -> Result<String, ConversionError> {
        if markdown.contains("!broken") {
            return Err(ConversionError::new("unclosed element <div>"));
        }
        Ok(format!("<p>{}</p>", markdown.trim()))
    }

    type MarkupFn = fn(&str) -> Result<String, ConversionError>;

    fn engine(remote: &MockRemote) -> SyncEngine<&MockRemote, MarkupFn> {
        engine_with(remote, SyncOptions::new(SPACE))
    }

    fn engine_with(remote: &MockRemote, options: SyncOptions) -> SyncEngine<&MockRemote, MarkupFn> {
        SyncEngine::new(remote, to_markup as MarkupFn, options)
    }

    fn outcomes(report: &SyncReport) -> Vec<(String, &'static str)> {
        report
            .nodes
            .iter()
            .map(|node| (node.title.clone(), node.outcome.label()))
            .collect()
    }

    fn expected(pairs: &[(&str, &'static str)]) -> Vec<(String, &'static str)> {
        pairs
            .iter()
            .map(|(title, label)| ((*title).to_owned(), *label))
            .collect()
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn guide_docs() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.md", "---\ntitle: Home\n---\nWelcome");
        write(dir.path(), "guide/index.md", "The guide");
        write(dir.path(), "guide/intro.md", "Getting started");
        dir
    }

    /// Home -> [A -> [B -> [D], C], E]
    fn branching_tree(b_content: &str) -> DocumentTree {
        let mut tree = DocumentTree::new("Home", Some("home".to_owned()));
        let a = tree.add_child(tree.root(), "a", "A", None);
        let b = tree.add_child(a, "a/b", "B", Some(b_content.to_owned()));
        tree.add_child(b, "a/b/d.md", "D", Some("d".to_owned()));
        tree.add_child(a, "a/c.md", "C", Some("c".to_owned()));
        tree.add_child(tree.root(), "e.md", "E", Some("e".to_owned()));
        tree
    }

    fn create_calls(remote: &MockRemote) -> Vec<(String, Option<PageId>)> {
        remote
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                RemoteCall::CreatePage {
                    title, parent_id, ..
                } => Some((title, parent_id)),
                _ => None,
            })
            .collect()
    }

    fn update_calls(remote: &MockRemote) -> usize {
        remote
            .calls()
            .iter()
            .filter(|call| matches!(call, RemoteCall::UpdatePage { .. }))
            .count()
    }

    #[test]
    fn test_empty_space_creates_parent_before_child() {
        let docs = guide_docs();
        let tree = load(docs.path()).unwrap();
        let remote = MockRemote::new();

        let report = engine(&remote).run(&tree);

        assert!(report.is_success());
        assert_eq!(
            outcomes(&report),
            expected(&[("Home", "created"), ("Guide", "created"), ("Intro", "created")])
        );

        let creates = create_calls(&remote);
        let home = remote.page_by_title(SPACE, "Home").unwrap().id;
        let guide = remote.page_by_title(SPACE, "Guide").unwrap().id;
        assert_eq!(
            creates,
            vec![
                ("Home".to_owned(), None),
                ("Guide".to_owned(), Some(home.clone())),
                ("Intro".to_owned(), Some(guide.clone())),
            ]
        );
        assert_eq!(report.remote_ids.page_id(tree.root()), Some(&home));
        assert_eq!(report.remote_ids.synced_count(), 3);
    }

    #[test]
    fn test_second_run_is_all_skip() {
        let docs = guide_docs();
        let tree = load(docs.path()).unwrap();
        let remote = MockRemote::new();
        engine(&remote).run(&tree);
        remote.clear_calls();

        let report = engine(&remote).run(&tree);

        assert_eq!(report.summary.skipped, 3);
        assert!(report.is_success());
        assert!(
            remote
                .calls()
                .iter()
                .all(|call| matches!(call, RemoteCall::GetPage { .. }))
        );
    }

    #[test]
    fn test_created_markup_resolves_to_skip() {
        let tree = DocumentTree::new("Home", Some("  hello\r\n".to_owned()));
        let remote = MockRemote::new();
        engine(&remote).run(&tree);

        assert_eq!(remote.page_by_title(SPACE, "Home").unwrap().body, "<p>hello</p>");
        let report = engine(&remote).run(&tree);
        assert_eq!(outcomes(&report), expected(&[("Home", "skipped")]));
    }

    #[test]
    fn test_edit_leaf_updates_only_leaf() {
        let docs = guide_docs();
        let remote = MockRemote::new();
        engine(&remote).run(&load(docs.path()).unwrap());

        write(docs.path(), "guide/intro.md", "Getting started, revised");
        let report = engine(&remote).run(&load(docs.path()).unwrap());

        assert_eq!(
            outcomes(&report),
            expected(&[("Home", "skipped"), ("Guide", "skipped"), ("Intro", "updated")])
        );
        let intro = remote.page_by_title(SPACE, "Intro").unwrap();
        assert_eq!(intro.version, 2);
        assert_eq!(intro.body, "<p>Getting started, revised</p>");
    }

    #[test]
    fn test_conversion_failure_blocks_only_subtree() {
        let tree = branching_tree("!broken");
        let remote = MockRemote::new();

        let report = engine(&remote).run(&tree);

        assert_eq!(
            outcomes(&report),
            expected(&[
                ("Home", "created"),
                ("A", "created"),
                ("B", "failed"),
                ("D", "blocked"),
                ("C", "created"),
                ("E", "created"),
            ])
        );
        let d = report.by_title("D").unwrap();
        assert_eq!(
            d.outcome,
            NodeOutcome::Blocked {
                ancestor: PathBuf::from("a/b")
            }
        );
        assert!(matches!(
            report.by_title("B").unwrap().outcome,
            NodeOutcome::Failed(NodeError::Convert(_))
        ));
        assert_eq!(remote.page_by_title(SPACE, "D"), None);
        assert!(!report.is_success());
    }

    #[test]
    fn test_resolve_error_fails_node() {
        let tree = branching_tree("b");
        let remote = MockRemote::new();
        remote.fail_get("A", RemoteError::Transport("timed out".to_owned()));

        let report = engine(&remote).run(&tree);

        assert_eq!(
            report.by_title("A").unwrap().outcome,
            NodeOutcome::Failed(NodeError::Resolve(RemoteError::Transport(
                "timed out".to_owned()
            )))
        );
        assert_eq!(report.summary.blocked, 3);
        assert_eq!(report.by_title("E").unwrap().outcome.label(), "created");
        // Lookup errors never turn into a create
        assert!(create_calls(&remote).iter().all(|(title, _)| title != "A"));
    }

    #[test]
    fn test_create_error_fails_node() {
        let tree = branching_tree("b");
        let remote = MockRemote::new();
        let error = RemoteError::Http {
            status: 403,
            body: "not permitted".to_owned(),
        };
        remote.fail_create("E", error.clone());

        let report = engine(&remote).run(&tree);

        assert_eq!(
            report.by_title("E").unwrap().outcome,
            NodeOutcome::Failed(NodeError::Create(error))
        );
        assert_eq!(report.summary.created, 5);
    }

    #[test]
    fn test_conflict_retries_once_with_fresh_version() {
        let tree = DocumentTree::new("Home", Some("new".to_owned()));
        let remote = MockRemote::new();
        let id = remote.insert_page(SPACE, "Home", None, "<p>old</p>");
        remote.fail_times(
            RemoteOp::Update,
            "Home",
            RemoteError::VersionConflict {
                page_id: id.clone(),
            },
            1,
        );

        let report = engine(&remote).run(&tree);

        assert_eq!(
            report.nodes[0].outcome,
            NodeOutcome::Updated {
                page_id: id,
                version: 2
            }
        );
        assert_eq!(update_calls(&remote), 2);
    }

    #[test]
    fn test_persistent_conflict_gives_up_after_two_attempts() {
        let tree = DocumentTree::new("Home", Some("new".to_owned()));
        let remote = MockRemote::new();
        let id = remote.insert_page(SPACE, "Home", None, "<p>old</p>");
        remote.fail_update(
            "Home",
            RemoteError::VersionConflict {
                page_id: id.clone(),
            },
        );

        let report = engine(&remote).run(&tree);

        assert_eq!(update_calls(&remote), 2);
        assert_eq!(
            report.nodes[0].outcome,
            NodeOutcome::Failed(NodeError::VersionConflict { page_id: id })
        );
    }

    #[test]
    fn test_update_error_is_not_retried() {
        let tree = DocumentTree::new("Home", Some("new".to_owned()));
        let remote = MockRemote::new();
        remote.insert_page(SPACE, "Home", None, "<p>old</p>");
        let error = RemoteError::Http {
            status: 500,
            body: "boom".to_owned(),
        };
        remote.fail_update("Home", error.clone());

        let report = engine(&remote).run(&tree);

        assert_eq!(update_calls(&remote), 1);
        assert_eq!(
            report.nodes[0].outcome,
            NodeOutcome::Failed(NodeError::Update(error))
        );
    }

    /// Removes the page when an update arrives, then reports a conflict.
    struct VanishingRemote(MockRemote);

    impl RemotePages for VanishingRemote {
        fn get_page(&self, space: &str, title: &str) -> Result<Option<RemotePageRef>, RemoteError> {
            self.0.get_page(space, title)
        }

        fn create_page(
            &self,
            space: &str,
            parent_id: Option<&PageId>,
            title: &str,
            body: &str,
        ) -> Result<PageVersion, RemoteError> {
            self.0.create_page(space, parent_id, title, body)
        }

        fn update_page(
            &self,
            page_id: &PageId,
            _version: u32,
            _title: &str,
            _body: &str,
            _parent_id: Option<&PageId>,
        ) -> Result<PageVersion, RemoteError> {
            self.0.remove_page(page_id);
            Err(RemoteError::VersionConflict {
                page_id: page_id.clone(),
            })
        }
    }

    #[test]
    fn test_conflict_on_deleted_page_reports_vanished() {
        let tree = DocumentTree::new("Home", Some("new".to_owned()));
        let remote = VanishingRemote(MockRemote::new());
        let id = remote.0.insert_page(SPACE, "Home", None, "<p>old</p>");

        let report = SyncEngine::new(&remote, to_markup, SyncOptions::new(SPACE)).run(&tree);

        assert_eq!(
            report.nodes[0].outcome,
            NodeOutcome::Failed(NodeError::Vanished { page_id: id })
        );
    }

    #[test]
    fn test_misplaced_page_is_moved() {
        let tree = branching_tree("b");
        let remote = MockRemote::new();
        engine(&remote).run(&tree);
        let home = remote.page_by_title(SPACE, "Home").unwrap().id;
        let c = remote.page_by_title(SPACE, "C").unwrap().id;
        remote
            .update_page(&c, 1, "C", "<p>c</p>", Some(&home))
            .unwrap();

        let report = engine(&remote).run(&tree);

        assert_eq!(report.by_title("C").unwrap().outcome.label(), "updated");
        let a = remote.page_by_title(SPACE, "A").unwrap().id;
        assert_eq!(remote.page_by_title(SPACE, "C").unwrap().parent_id, Some(a));
    }

    #[test]
    fn test_root_parent_anchors_tree() {
        let tree = branching_tree("b");
        let remote = MockRemote::new();
        let anchor = remote.insert_page(SPACE, "Docs Root", None, "");

        let options = SyncOptions::new(SPACE).with_root_parent(Some(anchor.clone()));
        let report = engine_with(&remote, options).run(&tree);

        assert!(report.is_success());
        assert_eq!(
            remote.page_by_title(SPACE, "Home").unwrap().parent_id,
            Some(anchor)
        );
    }

    #[test]
    fn test_stop_policy_cancels_remaining_nodes() {
        let tree = branching_tree("!broken");
        let remote = MockRemote::new();

        let options = SyncOptions::new(SPACE).with_failure_policy(FailurePolicy::Stop);
        let report = engine_with(&remote, options).run(&tree);

        assert_eq!(
            outcomes(&report),
            expected(&[
                ("Home", "created"),
                ("A", "created"),
                ("B", "failed"),
                ("D", "blocked"),
                ("C", "cancelled"),
                ("E", "cancelled"),
            ])
        );
        assert_eq!(remote.page_by_title(SPACE, "C"), None);
    }

    #[test]
    fn test_cancelled_run_makes_no_calls() {
        let tree = branching_tree("b");
        let remote = MockRemote::new();
        let flag = CancelFlag::new();
        flag.cancel();

        let report = engine(&remote).with_cancel_flag(flag).run(&tree);

        assert_eq!(report.summary.cancelled, tree.len());
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let mut tree = DocumentTree::new("Home", Some("home".to_owned()));
        for section in 0..4 {
            let dir = tree.add_child(
                tree.root(),
                format!("s{section}"),
                format!("Section {section}"),
                None,
            );
            for page in 0..3 {
                let content = if section == 2 && page == 1 {
                    "!broken".to_owned()
                } else {
                    format!("page {section}.{page}")
                };
                tree.add_child(
                    dir,
                    format!("s{section}/p{page}.md"),
                    format!("Page {section}.{page}"),
                    Some(content),
                );
            }
        }

        let sequential_remote = MockRemote::new();
        let sequential = engine(&sequential_remote).run(&tree);
        let parallel_remote = MockRemote::new();
        let parallel =
            engine_with(&parallel_remote, SyncOptions::new(SPACE).with_concurrency(4)).run(&tree);

        assert_eq!(outcomes(&parallel), outcomes(&sequential));
        assert_eq!(parallel.summary, sequential.summary);
        for id in tree.pre_order().into_iter().skip(1) {
            let node = tree.node(id);
            let Some(page) = parallel_remote.page_by_title(SPACE, &node.title) else {
                continue;
            };
            let parent = node.parent.unwrap();
            assert_eq!(page.parent_id.as_ref(), parallel.remote_ids.page_id(parent));
        }
    }

    #[test]
    fn test_concurrency_below_one_is_sequential() {
        assert_eq!(SyncOptions::new(SPACE).with_concurrency(0).concurrency, 1);
    }
}
