//! Mark-sweep garbage collection for the commit store
//!
//! Branch deletion never removes commits, so a repository accumulates
//! history unreachable from any branch head. This pass walks the commit
//! DAG from every branch head (following all parents, including both
//! sides of a merge) and sweeps what it never marked.

use std::collections::HashSet;

use tracing::debug;

use crate::commit::Repository;
use crate::store::{CommitId, CommitStore};

/// Statistics from a garbage collection run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcResult {
    /// Commits retained (reachable from a branch head)
    pub retained: usize,
    /// Commits removed
    pub collected: usize,
    /// Total commits before the run
    pub total_before: usize,
}

impl GcResult {
    /// True if any commits were removed
    #[inline]
    pub fn did_collect(&self) -> bool {
        self.collected > 0
    }
}

/// Remove every commit unreachable from the repository's branch heads.
///
/// 1. **Mark**: walk parent links from each branch head, visiting every
///    parent of every commit (merge commits contribute both).
/// 2. **Sweep**: drop all commits the walk never reached.
pub fn collect_garbage(repo: &mut Repository) -> GcResult {
    let roots = repo.branch_heads();
    let store = repo.store_mut();
    let all_ids = store.all_ids();
    let total_before = all_ids.len();

    let reachable = mark(store, &roots);

    let mut collected = 0;
    for id in &all_ids {
        if !reachable.contains(id) {
            store.remove(*id);
            collected += 1;
        }
    }
    debug!(collected, retained = total_before - collected, "gc run");

    GcResult {
        retained: total_before - collected,
        collected,
        total_before,
    }
}

/// Compute what a run would collect without removing anything
pub fn dry_run(repo: &Repository) -> GcResult {
    let roots = repo.branch_heads();
    let store = repo.store();
    let total_before = store.len();
    let retained = mark(store, &roots).len();
    GcResult {
        retained,
        collected: total_before - retained,
        total_before,
    }
}

/// Mark all commits reachable from `roots` via parent links
fn mark(store: &CommitStore, roots: &[CommitId]) -> HashSet<CommitId> {
    let mut reachable = HashSet::new();
    let mut queue: Vec<CommitId> = Vec::new();

    for &root in roots {
        if store.contains(root) && reachable.insert(root) {
            queue.push(root);
        }
    }

    while let Some(id) = queue.pop() {
        if let Some(commit) = store.get(id) {
            for &parent in &commit.parents {
                if store.contains(parent) && reachable.insert(parent) {
                    queue.push(parent);
                }
            }
        }
    }

    reachable
}
