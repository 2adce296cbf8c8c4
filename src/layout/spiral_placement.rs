// Spiral tree placement.
//
// Depth-first over the thread tree with an explicit stack:
// 1. Roots start at the canvas center, facing their sector midpoint
// 2. A node's curve is replayed from its descriptor or searched fresh
//    against every curve placed earlier in this pass
// 3. Children branch off the parent's point list, spread along 30%-90% of
//    it, facing the freest outward direction; a replayed child of a replayed
//    parent stays on the parent point its stored offset names
//
// A child's whole subtree is placed before its next sibling, so later
// siblings see everything placed so far. Nothing is revisited once accepted.
//
// All bookkeeping (placed curves, occupied points) lives in a LayoutSession
// that is dropped at the end of the pass.

use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::record::LayoutDescriptor;
use super::collision::PlacedCurve;
use super::direction::pick_branch_angle;
use super::geometry::{
    generate_spiral, positions, seeded_random, to_bezier, SpiralPath, STREAM_ANGLE_RNG, STREAM_BRANCH,
};
use super::tree::{Placement, ThreadTree};
use super::variation::{search_spiral, GenerationParams};
use super::{
    depth_scale, BranchRng, Canvas, LayoutConfig, LayoutWarning, PlacementStatus, PointF, SpiralGeometry,
};

/// Stored offsets further than this from the computed origin get logged.
const OFFSET_DRIFT_LOG: f64 = 0.5;
/// A stored offset this close to a parent point counts as that point.
const OFFSET_SNAP: f64 = 1e-6;

/// Geometry for one node, before it is paired with its record.
#[derive(Debug, Clone)]
pub struct PlacedNode {
    pub geometry: SpiralGeometry,
    pub needs_persist: bool,
    pub status: PlacementStatus,
}

/// Everything one pass produced, indexed like the tree's nodes.
#[derive(Debug, Clone, Default)]
pub struct PlacementOutput {
    pub nodes: Vec<PlacedNode>,
    pub warnings: Vec<LayoutWarning>,
}

/// Where a node's curve begins.
#[derive(Debug, Copy, Clone)]
enum Anchor {
    Root { start_angle: f64 },
    Branch { parent: usize, sibling: usize, siblings: usize },
}

#[derive(Debug, Copy, Clone)]
struct Frame {
    node: usize,
    depth: u32,
    allocated: f64,
    anchor: Anchor,
}

/// Occupied state for one layout pass.
pub struct LayoutSession<'c> {
    cfg: &'c LayoutConfig,
    canvas: &'c Canvas,
    placed: Vec<PlacedCurve>,
    occupied: Vec<PointF>,
    warnings: Vec<LayoutWarning>,
}

impl<'c> LayoutSession<'c> {
    pub fn new(cfg: &'c LayoutConfig, canvas: &'c Canvas) -> Self {
        Self {
            cfg,
            canvas,
            placed: Vec::new(),
            occupied: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn placed(&self) -> &[PlacedCurve] {
        &self.placed
    }

    pub fn occupied(&self) -> &[PointF] {
        &self.occupied
    }

    /// Record an accepted curve for later collision tests and scoring.
    fn occupy(&mut self, id: i64, path: &SpiralPath) {
        let pts = positions(&path.points);
        if let (Some(&first), Some(&last)) = (pts.first(), pts.last()) {
            self.occupied.push(first);
            self.occupied.push(last);
            self.occupied.push(pts[pts.len() / 2]);
        }
        self.placed.push(PlacedCurve::new(id, &pts, self.cfg.samples_per_segment));
    }

    fn angle_rng(&self, id: i64) -> StdRng {
        match self.cfg.branch_rng {
            BranchRng::Seeded(seed) => {
                StdRng::seed_from_u64(seed ^ seeded_random(id, STREAM_ANGLE_RNG).to_bits())
            }
            BranchRng::Entropy => StdRng::from_rng(&mut rand::rng()),
        }
    }
}

/// Fraction along the parent's points where sibling `k` of `n` branches off.
pub fn branch_fraction(child_id: i64, k: usize, n: usize, cfg: &LayoutConfig) -> f64 {
    let (lo, hi) = cfg.branch_span;
    let base = lo + (hi - lo) * (k + 1) as f64 / (n + 1) as f64;
    let jitter = (seeded_random(child_id, STREAM_BRANCH) - 0.5) * cfg.branch_jitter;
    (base + jitter).clamp(0.05, 0.95)
}

/// Index of the parent point that the stored offset sits on, if any.
fn stored_branch_index(parent: &SpiralGeometry, center: PointF, d: &LayoutDescriptor) -> Option<usize> {
    let target = PointF { x: center.x + d.offset_x, y: center.y + d.offset_y };
    parent.points.iter().position(|p| p.pos().dist(target) <= OFFSET_SNAP)
}

/// Place every node of `tree`. Always yields one geometry per node.
pub fn place_tree(tree: &ThreadTree, cfg: &LayoutConfig, canvas: &Canvas) -> PlacementOutput {
    let mut session = LayoutSession::new(cfg, canvas);
    let mut done: Vec<Option<PlacedNode>> = vec![None; tree.nodes.len()];

    let mut stack: Vec<Frame> = tree
        .root_sectors()
        .into_iter()
        .rev()
        .map(|s| Frame {
            node: s.node,
            depth: 1,
            allocated: s.sector,
            anchor: Anchor::Root { start_angle: s.start_angle },
        })
        .collect();

    while let Some(frame) = stack.pop() {
        let node = &tree.nodes[frame.node];
        let id = node.record.id;
        let scale = depth_scale(frame.depth);

        let (origin, branch_index, parent_curvature) = match frame.anchor {
            Anchor::Root { .. } => (canvas.center(), None, None),
            Anchor::Branch { parent, sibling, siblings } => {
                // Parents are always popped before their children.
                let Some(parent_done) = done[parent].as_ref() else { continue };
                let parent_geom = &parent_done.geometry;
                // A replayed reply keeps its stored origin while the parent
                // is unchanged, so new siblings don't slide it along.
                let stored = match (&node.placement, parent_done.status) {
                    (Placement::Replayed(d), PlacementStatus::Replayed) => {
                        stored_branch_index(parent_geom, canvas.center(), d)
                    }
                    _ => None,
                };
                let idx = stored.unwrap_or_else(|| {
                    let f = branch_fraction(id, sibling, siblings, cfg);
                    let last = parent_geom.points.len().saturating_sub(1);
                    ((f * last as f64).round() as usize).min(last)
                });
                let bp = parent_geom.points[idx];
                (bp.pos(), Some((idx, bp)), Some(parent_geom.curvature))
            }
        };

        let start_angle = match (&node.placement, frame.anchor) {
            (Placement::Replayed(d), _) => d.start_angle,
            (Placement::Fresh, Anchor::Root { start_angle }) => start_angle,
            (Placement::Fresh, Anchor::Branch { .. }) => match branch_index {
                Some((_, bp)) => {
                    let mut rng = session.angle_rng(id);
                    pick_branch_angle(
                        &bp,
                        parent_curvature.unwrap_or(0.0),
                        frame.allocated,
                        scale,
                        &session.occupied,
                        canvas,
                        cfg,
                        &mut rng,
                    )
                }
                None => 0.0,
            },
        };

        let (path, params, status, needs_persist) = match &node.placement {
            Placement::Replayed(d) => {
                let center = canvas.center();
                let drift = PointF { x: origin.x - center.x - d.offset_x, y: origin.y - center.y - d.offset_y };
                if drift.x.abs() > OFFSET_DRIFT_LOG || drift.y.abs() > OFFSET_DRIFT_LOG {
                    debug!("message {id}: stored origin drifted by ({:.1}, {:.1})", drift.x, drift.y);
                }
                let path = generate_spiral(origin, start_angle, scale, id, &d.overrides, cfg);
                (path, d.overrides, PlacementStatus::Replayed, false)
            }
            Placement::Fresh => {
                let outcome = search_spiral(origin, start_angle, scale, id, &session.placed, cfg);
                let status = if outcome.collision_free {
                    PlacementStatus::Clear { attempts: outcome.attempts }
                } else {
                    warn!("message {id}: no collision-free variation, keeping the last one");
                    session.warnings.push(LayoutWarning::BestEffort { id });
                    PlacementStatus::BestEffort
                };
                (outcome.path, outcome.params, status, true)
            }
        };

        debug!("placed message {id} at depth {} ({status:?})", frame.depth);
        session.occupy(id, &path);

        let geometry = build_geometry(
            path,
            params,
            origin,
            start_angle,
            canvas,
            frame.depth,
            scale,
            frame.allocated,
            branch_index.map(|(i, _)| i),
        );
        done[frame.node] = Some(PlacedNode { geometry, needs_persist, status });

        let children = &node.children;
        let child_total: usize = children.iter().map(|&c| tree.nodes[c].weight).sum();
        for (k, &child) in children.iter().enumerate().rev() {
            let share = tree.nodes[child].weight as f64 / child_total.max(1) as f64;
            stack.push(Frame {
                node: child,
                depth: frame.depth + 1,
                allocated: frame.allocated * share * cfg.sibling_damping,
                anchor: Anchor::Branch { parent: frame.node, sibling: k, siblings: children.len() },
            });
        }
    }

    PlacementOutput {
        nodes: done.into_iter().flatten().collect(),
        warnings: session.warnings,
    }
}

#[allow(clippy::too_many_arguments)]
fn build_geometry(
    path: SpiralPath,
    params: GenerationParams,
    origin: PointF,
    start_angle: f64,
    canvas: &Canvas,
    depth: u32,
    scale: f64,
    allocated_angle: f64,
    branch_index: Option<usize>,
) -> SpiralGeometry {
    let pts = positions(&path.points);
    let bezier = to_bezier(&pts);
    let first = path.points.first().copied();
    let last = path.points.last().copied();
    let center = canvas.center();

    SpiralGeometry {
        start: first.map(|p| p.pos()).unwrap_or(origin),
        end: last.map(|p| p.pos()).unwrap_or(origin),
        start_angle: first.map(|p| p.angle).unwrap_or(start_angle),
        end_angle: last.map(|p| p.angle).unwrap_or(start_angle),
        curvature: path.curvature,
        depth,
        scale,
        params,
        descriptor: LayoutDescriptor {
            offset_x: origin.x - center.x,
            offset_y: origin.y - center.y,
            start_angle,
            overrides: params,
        },
        allocated_angle,
        branch_index,
        points: path.points,
        bezier,
    }
}
