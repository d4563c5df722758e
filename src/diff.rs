//! Structural snapshot diff engine
//!
//! Geometry records carry no persistent identity, so the diff infers it
//! in two passes: exact fingerprint matching first, then greedy
//! bounding-box overlap matching among the leftovers to classify edits
//! as modifications instead of remove+add pairs. Whatever survives both
//! passes is a genuine removal or addition.

use std::collections::HashMap;

use crate::geom::{overlap_area, GeomRecord, LayerId};

/// One reported change between two snapshots
///
/// Unchanged records are never reported. Indices refer back into the
/// original `before`/`after` snapshots handed to [`diff_snapshots`].
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// Present in `after` only
    Added {
        after_index: usize,
        geom: GeomRecord,
    },
    /// Present in `before` only
    Removed {
        before_index: usize,
        geom: GeomRecord,
    },
    /// Fuzzy-matched pair of equal kind and layer whose geometry changed
    Modified {
        before_index: usize,
        after_index: usize,
        before: GeomRecord,
        after: GeomRecord,
    },
}

impl DiffEntry {
    /// Layer the change sits on, for grouping in the host UI
    pub fn layer(&self) -> LayerId {
        match self {
            DiffEntry::Added { geom, .. } => geom.layer,
            DiffEntry::Removed { geom, .. } => geom.layer,
            DiffEntry::Modified { after, .. } => after.layer,
        }
    }
}

/// Per-category change counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffStats {
    /// True when nothing changed
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.modified == 0
    }
}

/// Diff output: ordered change list plus tallies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDiff {
    pub entries: Vec<DiffEntry>,
    pub stats: DiffStats,
}

impl SnapshotDiff {
    /// True when the snapshots were structurally identical
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the structural diff between two snapshots.
///
/// 1. **Exact pass** — fingerprint → indices maps for both sides; each
///    fingerprint present in both pairs up `min(count, count)`
///    occurrences first-with-first as unchanged.
/// 2. **Fuzzy pass** — each leftover `before` record greedily claims the
///    leftover `after` record of equal kind and layer with the greatest
///    positive bounding-box overlap, reported as `Modified`. Greedy, not
///    globally optimal; ties resolve to the first maximum.
/// 3. **Residual pass** — leftover `before` records are `Removed`,
///    leftover `after` records are `Added`.
pub fn diff_snapshots(before: &[GeomRecord], after: &[GeomRecord]) -> SnapshotDiff {
    let mut before_matched = vec![false; before.len()];
    let mut after_matched = vec![false; after.len()];

    // Exact pass: fingerprint -> ordered index lists
    let mut after_by_print: HashMap<String, Vec<usize>> = HashMap::new();
    for (ai, g) in after.iter().enumerate() {
        after_by_print.entry(g.fingerprint()).or_default().push(ai);
    }
    let mut before_by_print: HashMap<String, Vec<usize>> = HashMap::new();
    for (bi, g) in before.iter().enumerate() {
        before_by_print.entry(g.fingerprint()).or_default().push(bi);
    }
    for (print, before_indices) in &before_by_print {
        if let Some(after_indices) = after_by_print.get(print) {
            let pairs = before_indices.len().min(after_indices.len());
            for k in 0..pairs {
                before_matched[before_indices[k]] = true;
                after_matched[after_indices[k]] = true;
            }
        }
    }

    // Fuzzy pass: greedy best-overlap match among same kind and layer
    let mut entries = Vec::new();
    let mut stats = DiffStats::default();
    for bi in 0..before.len() {
        if before_matched[bi] {
            continue;
        }
        let b = &before[bi];
        let mut best: Option<(usize, f64)> = None;
        for (ai, a) in after.iter().enumerate() {
            if after_matched[ai] || a.kind != b.kind || a.layer != b.layer {
                continue;
            }
            let area = overlap_area(b, a);
            if area > 0.0 && best.map_or(true, |(_, prev)| area > prev) {
                best = Some((ai, area));
            }
        }
        if let Some((ai, _)) = best {
            before_matched[bi] = true;
            after_matched[ai] = true;
            entries.push(DiffEntry::Modified {
                before_index: bi,
                after_index: ai,
                before: b.clone(),
                after: after[ai].clone(),
            });
            stats.modified += 1;
        }
    }

    // Residual pass
    for (bi, g) in before.iter().enumerate() {
        if !before_matched[bi] {
            entries.push(DiffEntry::Removed {
                before_index: bi,
                geom: g.clone(),
            });
            stats.removed += 1;
        }
    }
    for (ai, g) in after.iter().enumerate() {
        if !after_matched[ai] {
            entries.push(DiffEntry::Added {
                after_index: ai,
                geom: g.clone(),
            });
            stats.added += 1;
        }
    }

    SnapshotDiff { entries, stats }
}
