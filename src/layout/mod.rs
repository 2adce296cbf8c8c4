// Spiral layout for conversation threads.
//
// Goals:
// - Every message gets one spiral curve; replies grow out of their parent
// - Roots share the full turn around the canvas center by subtree weight
// - Fresh curves search for a variation that avoids earlier curves
// - Persisted descriptors replay exactly, with no search
// - Best-effort: layout always completes, collisions are only warnings
//
// Submodules:
// - geometry: seeded spiral points, Bezier conversion and sampling
// - collision: sampled curve intersection with branch-point skipping
// - variation: alternate generation parameters and the retry search
// - direction: free-space scoring of child branch angles
// - tree: thread tree from flat records, subtree weights, root sectors
// - spiral_placement: depth-first placement with a per-call session
//
// Output:
// - LayoutResult with one SpiralGeometry per input record, in input order.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::LayoutError;
use crate::record::{LayoutDescriptor, MessageRecord};

pub mod collision;
pub mod direction;
pub mod geometry;
pub mod spiral_placement;
pub mod tree;
pub mod variation;

use geometry::{BezierSegment, SpiralPoint};
use spiral_placement::place_tree;
use tree::ThreadTree;
use variation::GenerationParams;

#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize)]
pub struct PointF {
    pub x: f64,
    pub y: f64,
}

impl PointF {
    pub fn sub(self, other: PointF) -> PointF {
        PointF { x: self.x - other.x, y: self.y - other.y }
    }

    /// z component of the 2D cross product.
    pub fn cross(self, other: PointF) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn dist(self, other: PointF) -> f64 {
        let d = self.sub(other);
        (d.x * d.x + d.y * d.y).sqrt()
    }
}

/// Axis-aligned bounds, edges inclusive.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct RectF {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl RectF {
    /// Bounds of a point set, `None` when empty.
    pub fn bounding(points: &[PointF]) -> Option<RectF> {
        let first = points.first()?;
        let init = RectF { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
        Some(points.iter().fold(init, |r, p| RectF {
            min_x: r.min_x.min(p.x),
            min_y: r.min_y.min(p.y),
            max_x: r.max_x.max(p.x),
            max_y: r.max_y.max(p.y),
        }))
    }

    pub fn overlaps(&self, other: &RectF) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Drawing surface the layout is centered on.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> PointF {
        PointF { x: self.width / 2.0, y: self.height / 2.0 }
    }

    /// Inside the canvas shrunk by `margin` on every side.
    pub fn contains_inset(&self, p: PointF, margin: f64) -> bool {
        p.x >= margin && p.x <= self.width - margin && p.y >= margin && p.y <= self.height - margin
    }
}

/// Source of randomness for the weighted branch-angle choice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum BranchRng {
    /// Fresh OS entropy per layout: unpersisted layouts vary between calls.
    #[default]
    Entropy,
    /// Reproducible: each node's draw is seeded from this value and its id.
    Seeded(u64),
}

#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Points per spiral, minus one (the path has `point_count + 1` points).
    pub point_count: usize,
    /// Spiral length at scale 1 before jitter.
    pub base_length: f64,
    /// Total tangent rotation at curvature scale 1 before jitter (radians).
    pub base_curvature: f64,
    /// Bezier samples per point pair for collision tests.
    pub samples_per_segment: usize,
    /// Point pairs ignored at the start of both curves in collision tests.
    pub skip_prefix: usize,
    /// Branch fractions of the first and last sibling are spread over this range.
    pub branch_span: (f64, f64),
    /// Width of the seeded jitter added to each branch fraction.
    pub branch_jitter: f64,
    /// Sibling sectors are scaled by this so they leave room between them.
    pub sibling_damping: f64,
    /// Number of candidate angles tried at each branch point.
    pub candidate_count: usize,
    /// Widest fan of candidate angles (radians).
    pub max_branch_spread: f64,
    /// How far along a candidate angle free space is probed, at scale 1.
    pub probe_distance: f64,
    /// Inset from the canvas edge for the out-of-bounds penalty.
    pub canvas_margin: f64,
    /// Multiplier applied to scores of probes outside the inset canvas.
    pub out_of_bounds_penalty: f64,
    pub branch_rng: BranchRng,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            point_count: 50,
            base_length: 220.0,
            base_curvature: 2.5,
            samples_per_segment: 8,
            skip_prefix: 3,
            branch_span: (0.3, 0.9),
            branch_jitter: 0.08,
            sibling_damping: 0.85,
            candidate_count: 5,
            max_branch_spread: 1.6,
            probe_distance: 120.0,
            canvas_margin: 40.0,
            out_of_bounds_penalty: 0.2,
            branch_rng: BranchRng::Entropy,
        }
    }
}

/// Depth scale: 1.0 for roots, shrinking 15% per level down to 0.4.
pub fn depth_scale(depth: u32) -> f64 {
    (1.0 - 0.15 * (f64::from(depth) - 1.0)).max(0.4)
}

/// How a node's geometry was obtained.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementStatus {
    /// Regenerated from a persisted descriptor.
    Replayed,
    /// Search found a collision-free variation after `attempts` tries.
    Clear { attempts: usize },
    /// Every variation collided; the last one was kept.
    BestEffort,
}

/// Final geometry of one node.
#[derive(Debug, Clone, Serialize)]
pub struct SpiralGeometry {
    pub points: Vec<SpiralPoint>,
    pub bezier: Vec<BezierSegment>,
    pub start: PointF,
    pub end: PointF,
    pub start_angle: f64,
    pub end_angle: f64,
    /// Signed total rotation (radians); the sign is the curl.
    pub curvature: f64,
    pub depth: u32,
    pub scale: f64,
    pub params: GenerationParams,
    pub descriptor: LayoutDescriptor,
    /// Angular sector this node's subtree was given.
    pub allocated_angle: f64,
    /// Index into the parent's points where this curve starts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_index: Option<usize>,
}

/// Something the layout worked around rather than failing on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutWarning {
    /// Parent id not in the input set; the record became a root.
    OrphanPromoted { id: i64, parent_id: i64 },
    /// The record sat on a parent cycle and was made a root to break it.
    CycleBroken { id: i64 },
    /// Same id seen again; children attach to the first occurrence.
    DuplicateId { id: i64 },
    /// Stored layout data did not parse; the node was searched fresh.
    InvalidDescriptor { id: i64, message: String },
    /// No variation avoided existing curves.
    BestEffort { id: i64 },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OrphanPromoted { id, parent_id } => {
                write!(f, "message {id}: parent {parent_id} not found, placed as root")
            }
            Self::CycleBroken { id } => write!(f, "message {id}: parent cycle broken here"),
            Self::DuplicateId { id } => write!(f, "message {id}: duplicate id"),
            Self::InvalidDescriptor { id, message } => {
                write!(f, "message {id}: ignoring layout data ({message})")
            }
            Self::BestEffort { id } => write!(f, "message {id}: no collision-free variation"),
        }
    }
}

/// One input record with its computed layout.
#[derive(Debug, Clone)]
pub struct LaidOutNode<'a> {
    pub record: &'a MessageRecord,
    pub geometry: SpiralGeometry,
    /// True when the geometry came from a fresh search and should be stored.
    pub needs_persist: bool,
    pub status: PlacementStatus,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutResult<'a> {
    /// Same order as the input records.
    pub nodes: Vec<LaidOutNode<'a>>,
    pub warnings: Vec<LayoutWarning>,
}

impl<'a> LayoutResult<'a> {
    pub fn get(&self, id: i64) -> Option<&LaidOutNode<'a>> {
        self.nodes.iter().find(|n| n.record.id == id)
    }

    /// Serialized descriptors of every node that needs persisting, keyed by
    /// message id. This is the body of a bulk layout update.
    pub fn persistable_layouts(&self) -> Result<BTreeMap<i64, String>, LayoutError> {
        self.nodes
            .iter()
            .filter(|n| n.needs_persist)
            .map(|n| n.geometry.descriptor.to_json().map(|json| (n.record.id, json)))
            .collect()
    }
}

/// Layout engine bound to a canvas size.
#[derive(Debug, Clone)]
pub struct SpiralLayouter {
    cfg: LayoutConfig,
    canvas: Canvas,
}

impl SpiralLayouter {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_config(LayoutConfig::default(), width, height)
    }

    pub fn with_config(cfg: LayoutConfig, width: f64, height: f64) -> Self {
        Self { cfg, canvas: Canvas::new(width, height) }
    }

    /// Later layouts center roots on the new size.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas = Canvas::new(width, height);
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.cfg
    }

    pub fn config_mut(&mut self) -> &mut LayoutConfig {
        &mut self.cfg
    }

    /// Lay out every record. Never fails; problems come back as warnings.
    pub fn layout<'a>(&self, records: &'a [MessageRecord]) -> LayoutResult<'a> {
        if records.is_empty() {
            return LayoutResult::default();
        }

        let (tree, mut warnings) = ThreadTree::build(records);
        let placed = place_tree(&tree, &self.cfg, &self.canvas);
        warnings.extend(placed.warnings);

        let nodes = tree
            .nodes
            .iter()
            .zip(placed.nodes)
            .map(|(node, p)| LaidOutNode {
                record: node.record,
                geometry: p.geometry,
                needs_persist: p.needs_persist,
                status: p.status,
            })
            .collect();

        LayoutResult { nodes, warnings }
    }
}
