//! Commit objects and the append-only commit store
//!
//! Each commit holds a full deep-copied snapshot, never a delta. Commits
//! are immutable once inserted and are only ever removed by an explicit
//! garbage-collection pass — branch deletion leaves them in place.

use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geom::Snapshot;

/// Opaque random commit identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitId(pub Uuid);

impl CommitId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A commit in the history DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Commit identifier
    pub id: CommitId,
    /// Commit message, accepted verbatim
    pub message: String,
    /// Wall-clock creation time, epoch milliseconds
    pub timestamp_ms: u64,
    /// Author string as supplied by the host
    pub author: String,
    /// Parent commit ids: none for the root, one for a plain commit,
    /// two for a merge commit
    pub parents: Vec<CommitId>,
    /// Full layout snapshot at this commit
    pub snapshot: Snapshot,
    /// Name of the branch that was current when the commit was created
    pub branch: String,
}

/// Epoch milliseconds from the wall clock
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Append-only commit map (O(1) lookup via HashMap)
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CommitStore {
    commits: HashMap<CommitId, Commit>,
}

impl CommitStore {
    pub fn new() -> Self {
        Self {
            commits: HashMap::new(),
        }
    }

    /// Insert a commit under its own id
    pub fn insert(&mut self, commit: Commit) {
        self.commits.insert(commit.id, commit);
    }

    /// Retrieve a commit by id
    pub fn get(&self, id: CommitId) -> Option<&Commit> {
        self.commits.get(&id)
    }

    /// Check if an id exists
    pub fn contains(&self, id: CommitId) -> bool {
        self.commits.contains_key(&id)
    }

    /// Total stored commits
    pub fn len(&self) -> usize {
        self.commits.len()
    }

    /// Is the store empty?
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// List all stored commit ids
    pub fn all_ids(&self) -> Vec<CommitId> {
        self.commits.keys().copied().collect()
    }

    /// Remove a commit by id. Returns `true` if it existed. Used only by
    /// the garbage collector.
    pub fn remove(&mut self, id: CommitId) -> bool {
        self.commits.remove(&id).is_some()
    }
}
