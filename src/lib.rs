//! layout-vcs — Version Control for Layout Geometry
//!
//! Don't diff text, diff the geometry.
//!
//! In-memory commit/branch/merge engine for a chip-layout editor:
//! - Snapshot commits over flat geometry records (no persistent ids)
//! - Structural diff via fingerprints plus bounding-box fuzzy matching
//! - 3-way merge with explicit conflict resolution
//! - Garbage collection for commits unreachable from any branch
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`geom`] | Geometry records, fingerprints, and bounding boxes |
//! | [`store`] | Commit objects and the append-only commit store |
//! | [`commit`] | Repository: branches, HEAD, checkout, history |
//! | [`diff`] | Identity-free snapshot diff (Added, Removed, Modified) |
//! | [`merge`] | 3-way merge sessions with conflict resolution |
//! | [`gc`] | Mark-sweep collection of unreachable commits |
//!
//! # Quick Start
//!
//! ```
//! use layout_vcs::{GeomRecord, Point, Repository, ShapeKind};
//!
//! let rect = |h: f64| {
//!     GeomRecord::new(
//!         ShapeKind::Rect,
//!         1,
//!         vec![Point::new(0.0, 0.0), Point::new(2.0, h)],
//!     )
//! };
//!
//! let mut repo = Repository::new();
//! repo.init(&vec![rect(4.0)], "initial layout");
//!
//! // Stretch the rectangle and commit
//! let edited = vec![rect(5.0)];
//! let changes = repo.working_changes(&edited).unwrap();
//! assert_eq!(changes.stats.modified, 1);
//! repo.commit("stretch rect", &edited).unwrap();
//! ```

pub mod commit;
pub mod diff;
pub mod gc;
pub mod geom;
pub mod merge;
pub mod store;

pub use commit::{Branch, Repository, MAIN_BRANCH};
pub use diff::{diff_snapshots, DiffEntry, DiffStats, SnapshotDiff};
pub use gc::{collect_garbage, dry_run, GcResult};
pub use geom::{overlap_area, BBox, GeomRecord, LayerId, Point, ShapeKind, Snapshot};
pub use merge::{detect_conflicts, MergeConflict, Resolution};
pub use store::{Commit, CommitId, CommitStore};
