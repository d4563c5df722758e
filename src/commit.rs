//! Commit graph and branch bookkeeping
//!
//! Git-like repository over flat layout snapshots. Commits are immutable,
//! branches are movable pointers, `main` is indestructible. Every lookup
//! that can fail returns a sentinel (`None`/`false`) instead of panicking:
//! the engine is embedded in an editor and malformed calls must degrade
//! gracefully, never crash the host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diff::{diff_snapshots, SnapshotDiff};
use crate::geom::Snapshot;
use crate::merge::MergeSession;
use crate::store::{now_ms, Commit, CommitId, CommitStore};

/// Name of the default, undeletable branch
pub const MAIN_BRANCH: &str = "main";

/// Branch pointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name (unique key)
    pub name: String,
    /// Commit the branch currently points to
    pub head: CommitId,
    /// Wall-clock creation time, epoch milliseconds
    pub created_at_ms: u64,
    /// Branch that was current when this one was created
    pub upstream: Option<String>,
}

/// Repository — commit store, branch table, HEAD, and the displayed log
///
/// Created empty with [`Repository::new`] and initialized exactly once via
/// [`Repository::init`]. One instance per running editor; owned and passed
/// explicitly, no global state.
#[derive(Debug, Default)]
pub struct Repository {
    store: CommitStore,
    branches: BTreeMap<String, Branch>,
    current: Option<String>,
    /// First-parent commit ids for the current branch, newest first.
    /// Merge commits' second parents are not walked.
    log: Vec<CommitId>,
    pub(crate) merge: Option<MergeSession>,
}

impl Repository {
    /// Empty, uninitialized repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize with a root commit on `main`. Returns `false` (and
    /// changes nothing) if the repository is already initialized —
    /// re-initializing would wipe history, so callers must guard.
    pub fn init(&mut self, snapshot: &Snapshot, label: &str) -> bool {
        if self.current.is_some() || !self.branches.is_empty() {
            warn!("init refused: repository already initialized");
            return false;
        }
        let id = self.fresh_commit_id();
        let now = now_ms();
        self.store.insert(Commit {
            id,
            message: String::from(label),
            timestamp_ms: now,
            author: String::from("system"),
            parents: vec![],
            snapshot: snapshot.clone(),
            branch: String::from(MAIN_BRANCH),
        });
        self.branches.insert(
            String::from(MAIN_BRANCH),
            Branch {
                name: String::from(MAIN_BRANCH),
                head: id,
                created_at_ms: now,
                upstream: None,
            },
        );
        self.current = Some(String::from(MAIN_BRANCH));
        self.log = vec![id];
        debug!(commit = %id, "initialized repository");
        true
    }

    /// Commit the given snapshot on the current branch. `None` when the
    /// repository is uninitialized or the current branch is gone. The
    /// message is stored verbatim — validating non-emptiness is a UI
    /// concern, not an engine concern.
    pub fn commit(&mut self, message: &str, snapshot: &Snapshot) -> Option<CommitId> {
        let branch_name = match self.current.clone() {
            Some(b) => b,
            None => {
                warn!("commit refused: no current branch");
                return None;
            }
        };
        let parent = self.branches.get(&branch_name)?.head;
        let id = self.fresh_commit_id();
        self.store.insert(Commit {
            id,
            message: String::from(message),
            timestamp_ms: now_ms(),
            author: String::from("user"),
            parents: vec![parent],
            snapshot: snapshot.clone(),
            branch: branch_name.clone(),
        });
        if let Some(branch) = self.branches.get_mut(&branch_name) {
            branch.head = id;
        }
        self.log.insert(0, id);
        debug!(commit = %id, branch = %branch_name, "created commit");
        Some(id)
    }

    /// Create a merge commit with two parents: the current branch head
    /// and the source branch head. The orchestrating caller invokes this
    /// with the snapshot returned by a completed merge; the merge engine
    /// never commits on its own.
    pub fn commit_merge(
        &mut self,
        message: &str,
        snapshot: &Snapshot,
        source_branch: &str,
    ) -> Option<CommitId> {
        let branch_name = self.current.clone()?;
        let ours = self.branches.get(&branch_name)?.head;
        let theirs = self.branches.get(source_branch)?.head;
        let id = self.fresh_commit_id();
        self.store.insert(Commit {
            id,
            message: String::from(message),
            timestamp_ms: now_ms(),
            author: String::from("user"),
            parents: vec![ours, theirs],
            snapshot: snapshot.clone(),
            branch: branch_name.clone(),
        });
        if let Some(branch) = self.branches.get_mut(&branch_name) {
            branch.head = id;
        }
        self.log.insert(0, id);
        debug!(commit = %id, source = %source_branch, "created merge commit");
        Some(id)
    }

    /// Create a branch at the current head. No-op if the name is taken
    /// or the repository is uninitialized.
    pub fn create_branch(&mut self, name: &str) {
        if self.branches.contains_key(name) {
            debug!(branch = %name, "create_branch: name already exists");
            return;
        }
        let current = match self.current.clone() {
            Some(b) => b,
            None => {
                warn!("create_branch refused: repository uninitialized");
                return;
            }
        };
        let head = match self.branches.get(&current) {
            Some(b) => b.head,
            None => return,
        };
        self.branches.insert(
            String::from(name),
            Branch {
                name: String::from(name),
                head,
                created_at_ms: now_ms(),
                upstream: Some(current),
            },
        );
        debug!(branch = %name, "created branch");
    }

    /// Switch to a branch, returning a deep copy of its head snapshot for
    /// the caller to load into the editing surface. `None` when the
    /// branch is unknown or its head commit is missing from the store.
    pub fn checkout(&mut self, name: &str) -> Option<Snapshot> {
        let head = self.branches.get(name)?.head;
        let snapshot = self.store.get(head)?.snapshot.clone();
        self.current = Some(String::from(name));
        self.log = self.first_parent_chain(head);
        debug!(branch = %name, "checked out");
        Some(snapshot)
    }

    /// Delete a branch entry. Refuses `main` and the current branch.
    /// Commits stay in the store — they merely become unreachable.
    pub fn delete_branch(&mut self, name: &str) -> bool {
        if name == MAIN_BRANCH {
            warn!("delete_branch refused: cannot delete main");
            return false;
        }
        if self.current.as_deref() == Some(name) {
            warn!(branch = %name, "delete_branch refused: branch is checked out");
            return false;
        }
        let removed = self.branches.remove(name).is_some();
        if removed {
            debug!(branch = %name, "deleted branch");
        }
        removed
    }

    /// First `limit` entries of the current branch's log, newest first
    pub fn history(&self, limit: usize) -> Vec<&Commit> {
        self.log
            .iter()
            .take(limit)
            .filter_map(|&id| self.store.get(id))
            .collect()
    }

    /// All branch names, sorted
    pub fn branch_names(&self) -> Vec<&str> {
        self.branches.keys().map(|s| s.as_str()).collect()
    }

    /// Currently checked-out branch, if initialized
    pub fn current_branch(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Branch entry by name
    pub fn get_branch(&self, name: &str) -> Option<&Branch> {
        self.branches.get(name)
    }

    /// Commit by id
    pub fn get_commit(&self, id: CommitId) -> Option<&Commit> {
        self.store.get(id)
    }

    /// Head commit of the current branch
    pub fn head_commit(&self) -> Option<&Commit> {
        let branch = self.branches.get(self.current.as_deref()?)?;
        self.store.get(branch.head)
    }

    /// Deep copy of the current head snapshot
    pub fn head_snapshot(&self) -> Option<Snapshot> {
        Some(self.head_commit()?.snapshot.clone())
    }

    /// Total commits in the store, reachable or not
    pub fn commit_count(&self) -> usize {
        self.store.len()
    }

    /// Structural diff between two commits' snapshots
    pub fn diff_commits(&self, from: CommitId, to: CommitId) -> Option<SnapshotDiff> {
        let before = &self.store.get(from)?.snapshot;
        let after = &self.store.get(to)?.snapshot;
        Some(diff_snapshots(before, after))
    }

    /// Diff of the live working set against the current head — the
    /// "uncommitted changes" view. Same code path as any other diff.
    pub fn working_changes(&self, working: &[crate::geom::GeomRecord]) -> Option<SnapshotDiff> {
        let head = self.head_commit()?;
        Some(diff_snapshots(&head.snapshot, working))
    }

    pub(crate) fn store(&self) -> &CommitStore {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut CommitStore {
        &mut self.store
    }

    /// Head commit ids of every branch
    pub fn branch_heads(&self) -> Vec<CommitId> {
        self.branches.values().map(|b| b.head).collect()
    }

    /// Random id, retried on the negligible chance it already exists
    fn fresh_commit_id(&self) -> CommitId {
        loop {
            let id = CommitId::random();
            if !self.store.contains(id) {
                return id;
            }
        }
    }

    /// Walk first parents from `head` while commits resolve
    fn first_parent_chain(&self, head: CommitId) -> Vec<CommitId> {
        let mut chain = Vec::new();
        let mut cursor = Some(head);
        while let Some(id) = cursor {
            let commit = match self.store.get(id) {
                Some(c) => c,
                None => break,
            };
            chain.push(id);
            cursor = commit.parents.first().copied();
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{GeomRecord, Point, ShapeKind};

    fn rect(layer: u32, x1: f64, y1: f64, x2: f64, y2: f64) -> GeomRecord {
        GeomRecord::new(
            ShapeKind::Rect,
            layer,
            vec![Point::new(x1, y1), Point::new(x2, y2)],
        )
    }

    fn rect_a() -> GeomRecord {
        rect(1, 0.0, 0.0, 2.0, 4.0)
    }

    fn rect_b() -> GeomRecord {
        rect(1, 10.0, 10.0, 12.0, 14.0)
    }

    fn init_repo() -> Repository {
        let mut repo = Repository::new();
        assert!(repo.init(&vec![rect_a()], "initial layout"));
        repo
    }

    #[test]
    fn test_new_repository_is_uninitialized() {
        let repo = Repository::new();
        assert!(repo.current_branch().is_none());
        assert_eq!(repo.commit_count(), 0);
        assert!(repo.branch_names().is_empty());
    }

    #[test]
    fn test_init_creates_main_and_root_commit() {
        let repo = init_repo();
        assert_eq!(repo.current_branch(), Some(MAIN_BRANCH));
        assert_eq!(repo.commit_count(), 1);
        let head = repo.head_commit().unwrap();
        assert!(head.parents.is_empty());
        assert_eq!(head.message, "initial layout");
        assert_eq!(head.branch, MAIN_BRANCH);
    }

    #[test]
    fn test_double_init_is_refused() {
        let mut repo = init_repo();
        let before = repo.commit_count();
        assert!(!repo.init(&vec![rect_b()], "again"));
        assert_eq!(repo.commit_count(), before);
    }

    #[test]
    fn test_commit_on_uninitialized_returns_none() {
        let mut repo = Repository::new();
        assert!(repo.commit("c", &vec![rect_a()]).is_none());
        assert_eq!(repo.commit_count(), 0);
    }

    #[test]
    fn test_commit_advances_head_and_log() {
        let mut repo = init_repo();
        let root = repo.head_commit().unwrap().id;
        let id = repo.commit("c1", &vec![rect_a(), rect_b()]).unwrap();
        assert_ne!(id, root);
        assert_eq!(repo.head_commit().unwrap().id, id);
        assert_eq!(repo.head_commit().unwrap().parents, vec![root]);
        // Newest first
        let history = repo.history(10);
        assert_eq!(history[0].id, id);
        assert_eq!(history[1].id, root);
    }

    #[test]
    fn test_commit_accepts_empty_message() {
        let mut repo = init_repo();
        let id = repo.commit("", &vec![rect_a()]).unwrap();
        assert_eq!(repo.get_commit(id).unwrap().message, "");
    }

    #[test]
    fn test_checkout_roundtrip_returns_committed_snapshot() {
        let mut repo = init_repo();
        let snapshot = vec![rect_a(), rect_b()];
        repo.commit("c1", &snapshot).unwrap();
        let restored = repo.checkout(MAIN_BRANCH).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_checkout_unknown_branch_returns_none() {
        let mut repo = init_repo();
        assert!(repo.checkout("nope").is_none());
        assert_eq!(repo.current_branch(), Some(MAIN_BRANCH));
    }

    #[test]
    fn test_create_branch_points_at_current_head_with_upstream() {
        let mut repo = init_repo();
        let head = repo.head_commit().unwrap().id;
        repo.create_branch("feature");
        let feature = repo.get_branch("feature").unwrap();
        assert_eq!(feature.head, head);
        assert_eq!(feature.upstream.as_deref(), Some(MAIN_BRANCH));
    }

    #[test]
    fn test_create_branch_existing_name_is_noop() {
        let mut repo = init_repo();
        repo.create_branch("feature");
        let head_before = repo.get_branch("feature").unwrap().head;
        repo.commit("advance", &vec![rect_b()]).unwrap();
        repo.create_branch("feature");
        assert_eq!(repo.get_branch("feature").unwrap().head, head_before);
    }

    #[test]
    fn test_branch_isolation() {
        // Committing on a feature branch never moves main's head
        let mut repo = init_repo();
        let main_head = repo.head_commit().unwrap().id;
        repo.create_branch("feature");
        repo.checkout("feature").unwrap();
        repo.commit("on feature", &vec![rect_a(), rect_b()]).unwrap();
        assert_eq!(repo.get_branch(MAIN_BRANCH).unwrap().head, main_head);
    }

    #[test]
    fn test_log_rebuilt_on_checkout() {
        let mut repo = init_repo();
        repo.create_branch("feature");
        repo.checkout("feature").unwrap();
        repo.commit("f1", &vec![rect_b()]).unwrap();
        repo.checkout(MAIN_BRANCH).unwrap();
        // main's log must not contain the feature commit
        let history = repo.history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message, "initial layout");
    }

    #[test]
    fn test_delete_branch_refuses_main_and_current() {
        let mut repo = init_repo();
        repo.create_branch("feature");
        repo.checkout("feature").unwrap();
        let names_before = repo.branch_names().len();
        assert!(!repo.delete_branch(MAIN_BRANCH));
        assert!(!repo.delete_branch("feature"));
        assert_eq!(repo.branch_names().len(), names_before);
    }

    #[test]
    fn test_delete_branch_keeps_commits_in_store() {
        let mut repo = init_repo();
        repo.create_branch("feature");
        repo.checkout("feature").unwrap();
        let id = repo.commit("f1", &vec![rect_b()]).unwrap();
        repo.checkout(MAIN_BRANCH).unwrap();
        assert!(repo.delete_branch("feature"));
        assert!(repo.get_branch("feature").is_none());
        // Commit is now unreachable but still stored
        assert!(repo.get_commit(id).is_some());
    }

    #[test]
    fn test_delete_unknown_branch_returns_false() {
        let mut repo = init_repo();
        assert!(!repo.delete_branch("ghost"));
    }

    #[test]
    fn test_history_respects_limit() {
        let mut repo = init_repo();
        for i in 0..5 {
            repo.commit(&format!("c{i}"), &vec![rect_a()]).unwrap();
        }
        assert_eq!(repo.history(3).len(), 3);
        assert_eq!(repo.history(100).len(), 6);
    }

    #[test]
    fn test_diff_commits_scenario_added_rect() {
        // init([RectA]); commit([RectA, RectB]) -> exactly one addition
        let mut repo = init_repo();
        let c1 = repo.head_commit().unwrap().id;
        let c2 = repo.commit("c1", &vec![rect_a(), rect_b()]).unwrap();
        let d = repo.diff_commits(c1, c2).unwrap();
        assert_eq!(d.stats.added, 1);
        assert_eq!(d.stats.removed, 0);
        assert_eq!(d.stats.modified, 0);
    }

    #[test]
    fn test_diff_commits_unknown_id_returns_none() {
        let repo = init_repo();
        assert!(repo.diff_commits(CommitId::random(), CommitId::random()).is_none());
    }

    #[test]
    fn test_working_changes_against_head() {
        let mut repo = init_repo();
        let mut working = vec![rect_a()];
        working.push(rect_b());
        let d = repo.working_changes(&working).unwrap();
        assert_eq!(d.stats.added, 1);

        // And a modified point shows up as modified, not remove+add
        let working = vec![rect(1, 0.0, 0.0, 2.0, 5.0)];
        let d = repo.working_changes(&working).unwrap();
        assert_eq!(d.stats.modified, 1);
        assert_eq!(d.stats.added, 0);
        assert_eq!(d.stats.removed, 0);
    }

    #[test]
    fn test_working_changes_uninitialized_returns_none() {
        let repo = Repository::new();
        assert!(repo.working_changes(&[rect_a()]).is_none());
    }

    #[test]
    fn test_commit_merge_records_both_parents() {
        let mut repo = init_repo();
        repo.create_branch("feature");
        repo.checkout("feature").unwrap();
        repo.commit("f1", &vec![rect_b()]).unwrap();
        repo.checkout(MAIN_BRANCH).unwrap();
        let main_head = repo.head_commit().unwrap().id;
        let feature_head = repo.get_branch("feature").unwrap().head;

        let merged = vec![rect_a(), rect_b()];
        let id = repo
            .commit_merge("merge branch 'feature'", &merged, "feature")
            .unwrap();
        let commit = repo.get_commit(id).unwrap();
        assert_eq!(commit.parents, vec![main_head, feature_head]);
        assert_eq!(repo.get_branch(MAIN_BRANCH).unwrap().head, id);
        // Source branch head is untouched
        assert_eq!(repo.get_branch("feature").unwrap().head, feature_head);
    }

    #[test]
    fn test_commit_merge_unknown_source_returns_none() {
        let mut repo = init_repo();
        assert!(repo.commit_merge("m", &vec![rect_a()], "ghost").is_none());
    }

    #[test]
    fn test_history_walks_first_parent_only() {
        let mut repo = init_repo();
        repo.create_branch("feature");
        repo.checkout("feature").unwrap();
        let f1 = repo.commit("f1", &vec![rect_b()]).unwrap();
        repo.checkout(MAIN_BRANCH).unwrap();
        repo.commit_merge("merge", &vec![rect_a(), rect_b()], "feature")
            .unwrap();

        let history = repo.history(10);
        let ids: Vec<CommitId> = history.iter().map(|c| c.id).collect();
        // f1 is only reachable through the merge's second parent
        assert!(!ids.contains(&f1));
        assert_eq!(history.len(), 2); // merge + root
    }

    #[test]
    fn test_snapshots_do_not_alias_caller_state() {
        let mut repo = Repository::new();
        let mut snapshot = vec![rect_a()];
        repo.init(&snapshot, "init");
        // Mutating the caller's list must not corrupt the stored commit
        snapshot.push(rect_b());
        assert_eq!(repo.head_commit().unwrap().snapshot.len(), 1);

        let mut restored = repo.checkout(MAIN_BRANCH).unwrap();
        restored.clear();
        assert_eq!(repo.head_commit().unwrap().snapshot.len(), 1);
    }
}
