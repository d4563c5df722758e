//! Layout geometry records
//!
//! Flat geometry primitives as the editor hands them over: shape kind,
//! layer, ordered points, optional width. Records carry no persistent
//! identifier — identity across snapshots is inferred via fingerprints
//! (exact) and bounding-box overlap (fuzzy).

use serde::{Deserialize, Serialize};

/// Layer identifier in the layout stack
pub type LayerId = u32;

/// A 2D point in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Shape kind — what type of layout primitive a record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Axis-aligned rectangle (two corner points)
    Rect,
    /// Closed polygon (vertex list)
    Polygon,
    /// Routed wire (centerline plus width)
    Path,
    /// Inter-layer via
    Via,
    /// Placed cell instance
    Instance,
}

impl ShapeKind {
    /// Short tag used in fingerprints
    fn tag(self) -> &'static str {
        match self {
            ShapeKind::Rect => "R",
            ShapeKind::Polygon => "G",
            ShapeKind::Path => "P",
            ShapeKind::Via => "V",
            ShapeKind::Instance => "I",
        }
    }
}

/// One geometry record in a snapshot
///
/// Structural equality (derived `PartialEq`) is exact: kind, layer, width
/// and every coordinate must match with no float tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeomRecord {
    /// Shape kind
    pub kind: ShapeKind,
    /// Layer the shape sits on
    pub layer: LayerId,
    /// Ordered point list (corners, vertices, or centerline)
    pub points: Vec<Point>,
    /// Wire width, where the kind has one
    pub width: Option<f64>,
}

impl GeomRecord {
    pub fn new(kind: ShapeKind, layer: LayerId, points: Vec<Point>) -> Self {
        Self {
            kind,
            layer,
            points,
            width: None,
        }
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    /// Canonical comparison key: kind tag, layer, every coordinate in
    /// order, then width. Structurally-equal records always fingerprint
    /// identically. Total — never fails, O(points).
    pub fn fingerprint(&self) -> String {
        let mut key = String::with_capacity(16 + self.points.len() * 12);
        key.push_str(self.kind.tag());
        key.push('|');
        key.push_str(&self.layer.to_string());
        for p in &self.points {
            key.push('|');
            key.push_str(&p.x.to_string());
            key.push(',');
            key.push_str(&p.y.to_string());
        }
        key.push('|');
        match self.width {
            Some(w) => key.push_str(&w.to_string()),
            None => key.push('-'),
        }
        key
    }

    /// Axis-aligned bounding box over all points. A single-point record
    /// yields a degenerate zero-area box; an empty point list yields a
    /// degenerate box at the origin.
    pub fn bbox(&self) -> BBox {
        let mut it = self.points.iter();
        let first = match it.next() {
            Some(p) => *p,
            None => return BBox::new(0.0, 0.0, 0.0, 0.0),
        };
        let mut bb = BBox::new(first.x, first.y, first.x, first.y);
        for p in it {
            bb.min_x = bb.min_x.min(p.x);
            bb.min_y = bb.min_y.min(p.y);
            bb.max_x = bb.max_x.max(p.x);
            bb.max_y = bb.max_y.max(p.y);
        }
        bb
    }
}

/// A complete ordered layout state at one point in time
pub type Snapshot = Vec<GeomRecord>;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Area of the intersection with `other`, 0.0 if disjoint
    pub fn intersection_area(&self, other: &BBox) -> f64 {
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }
}

/// Bounding-box overlap area between two records, 0.0 when the kinds or
/// layers differ. Only ever meaningful between records of equal kind and
/// layer; the guard keeps the score total anyway.
pub fn overlap_area(a: &GeomRecord, b: &GeomRecord) -> f64 {
    if a.kind != b.kind || a.layer != b.layer {
        return 0.0;
    }
    a.bbox().intersection_area(&b.bbox())
}
