//! Three-way merge with conflict detection and resolution
//!
//! Merges a source branch's head snapshot into the current working set.
//! The merge base is approximated as the current branch's HEAD at merge
//! time, not a true lowest common ancestor — with long-diverged branches
//! this can mis-classify conflicts, and the approximation is kept
//! deliberately (the host records it as a known limitation).
//!
//! State machine: Idle → Merging → Idle (via complete or abort). At most
//! one merge session exists; starting a new one aborts a stale session.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::commit::Repository;
use crate::geom::{GeomRecord, Snapshot};

/// Which side wins a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Keep the working-set (target) record
    Target,
    /// Keep the source branch's record
    Source,
}

/// One detected conflict between the working set and the source branch
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConflict {
    /// Position of the contested record in the target (working) snapshot
    pub target_index: usize,
    /// The target-side record
    pub target: GeomRecord,
    /// The source-side record — for deletion-vs-keep conflicts this is
    /// the base record standing in for what the source side removed
    pub source: GeomRecord,
    /// Chosen winner, unresolved until set
    pub resolution: Option<Resolution>,
}

/// In-progress merge state, held by the repository until completed or
/// aborted
#[derive(Debug)]
pub(crate) struct MergeSession {
    pub source_branch: String,
    pub conflicts: Vec<MergeConflict>,
}

/// Detect conflicts between `target` (working set) and `source` (branch
/// head) against the common `base`.
///
/// Two independent passes:
/// - **Fingerprint pass** over `base`: a record gone from both sides is a
///   concurrent deletion (no conflict); a record kept in `target` but
///   gone from `source` is a deletion-vs-keep conflict, pairing the kept
///   target record against the base record.
/// - **Positional pass** over indices valid in all three snapshots: a
///   conflict when `target[i]` and `source[i]` both differ from `base[i]`
///   and from each other.
pub fn detect_conflicts(
    base: &[GeomRecord],
    target: &[GeomRecord],
    source: &[GeomRecord],
) -> Vec<MergeConflict> {
    let mut conflicts = Vec::new();

    let mut target_by_print: HashMap<String, usize> = HashMap::new();
    for (ti, g) in target.iter().enumerate() {
        target_by_print.entry(g.fingerprint()).or_insert(ti);
    }
    let source_prints: HashSet<String> = source.iter().map(|g| g.fingerprint()).collect();

    let mut seen = HashSet::new();
    for base_geom in base {
        let print = base_geom.fingerprint();
        if !seen.insert(print.clone()) {
            continue;
        }
        let kept_in_target = target_by_print.get(&print).copied();
        let kept_in_source = source_prints.contains(&print);
        match (kept_in_target, kept_in_source) {
            // Deleted on both sides: concurrent deletion, no conflict
            (None, false) => {}
            // Kept in target, deleted in source: deletion vs keep
            (Some(ti), false) => conflicts.push(MergeConflict {
                target_index: ti,
                target: target[ti].clone(),
                source: base_geom.clone(),
                resolution: None,
            }),
            _ => {}
        }
    }

    let common = base.len().min(target.len()).min(source.len());
    for i in 0..common {
        if target[i] != base[i] && source[i] != base[i] && target[i] != source[i] {
            conflicts.push(MergeConflict {
                target_index: i,
                target: target[i].clone(),
                source: source[i].clone(),
                resolution: None,
            });
        }
    }

    conflicts
}

impl Repository {
    /// Begin merging `source_branch` into the current working set.
    /// Returns the detected conflicts (possibly empty, meaning the merge
    /// can complete immediately). Fails with an empty list and no state
    /// change when the source branch, its head commit, or the current
    /// head (the merge base) cannot be resolved. A stale in-progress
    /// session is aborted first.
    pub fn start_merge(
        &mut self,
        source_branch: &str,
        working: &[GeomRecord],
    ) -> Vec<MergeConflict> {
        let source_head = match self.get_branch(source_branch) {
            Some(b) => b.head,
            None => {
                warn!(branch = %source_branch, "start_merge: unknown source branch");
                return Vec::new();
            }
        };
        let source_snapshot = match self.get_commit(source_head) {
            Some(c) => c.snapshot.clone(),
            None => {
                warn!(branch = %source_branch, "start_merge: source head missing");
                return Vec::new();
            }
        };
        let base = match self.head_snapshot() {
            Some(s) => s,
            None => {
                warn!("start_merge: no current head to use as merge base");
                return Vec::new();
            }
        };
        if self.merge.is_some() {
            warn!("start_merge: aborting stale merge session");
            self.merge = None;
        }

        let conflicts = detect_conflicts(&base, working, &source_snapshot);
        debug!(
            branch = %source_branch,
            conflicts = conflicts.len(),
            "started merge"
        );
        self.merge = Some(MergeSession {
            source_branch: String::from(source_branch),
            conflicts: conflicts.clone(),
        });
        conflicts
    }

    /// Record a winner for the conflict at `index`. Out-of-range indices
    /// and calls outside a merge are silently ignored.
    pub fn resolve_conflict(&mut self, index: usize, resolution: Resolution) {
        if let Some(session) = &mut self.merge {
            match session.conflicts.get_mut(index) {
                Some(conflict) => conflict.resolution = Some(resolution),
                None => debug!(index, "resolve_conflict: index out of range"),
            }
        }
    }

    /// Finish the merge once every conflict carries a resolution.
    ///
    /// The merged snapshot starts as a deep copy of the source branch's
    /// head snapshot; each conflict resolved for the target overwrites
    /// the record at its target index (or appends, when the index lies
    /// past the end — the deletion-vs-keep case near the tail). Source
    /// resolutions need no action since the source snapshot is the base
    /// of the result. Clears the session; the caller commits the result,
    /// typically via [`Repository::commit_merge`].
    ///
    /// Returns `None` — leaving the session intact so resolution can
    /// continue — when no merge is active, the source branch or its head
    /// has gone away, or any conflict is still unresolved.
    pub fn complete_merge(&mut self) -> Option<Snapshot> {
        let source_branch = self.merge.as_ref()?.source_branch.clone();
        let source_head = match self.get_branch(&source_branch) {
            Some(b) => b.head,
            None => {
                warn!(branch = %source_branch, "complete_merge: source branch gone");
                return None;
            }
        };
        let mut merged = self.get_commit(source_head)?.snapshot.clone();

        let session = self.merge.as_ref()?;
        if session.conflicts.iter().any(|c| c.resolution.is_none()) {
            warn!("complete_merge: unresolved conflicts remain");
            return None;
        }
        for conflict in &session.conflicts {
            if conflict.resolution == Some(Resolution::Target) {
                if conflict.target_index < merged.len() {
                    merged[conflict.target_index] = conflict.target.clone();
                } else {
                    merged.push(conflict.target.clone());
                }
            }
        }
        debug!(branch = %source_branch, "completed merge");
        self.merge = None;
        Some(merged)
    }

    /// Discard the merge session and all recorded resolutions
    pub fn abort_merge(&mut self) {
        if self.merge.take().is_some() {
            debug!("aborted merge");
        }
    }

    /// True while a merge session is active
    pub fn merge_in_progress(&self) -> bool {
        self.merge.is_some()
    }

    /// Conflicts of the active session, empty when idle
    pub fn conflicts(&self) -> &[MergeConflict] {
        self.merge.as_ref().map_or(&[], |s| &s.conflicts)
    }
}
