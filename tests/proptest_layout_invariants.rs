//! Property-based invariant tests for the spiral thread layout.
//!
//! These tests verify structural invariants that must hold for any thread
//! shape:
//!
//! 1. Subtree weight is one plus the children's weights.
//! 2. Root sectors cover the full turn; every allocation is positive.
//! 3. Every reply starts exactly on its parent's branch point.
//! 4. Stored descriptors replay identical geometry, without persisting.
//! 5. Layout always yields one geometry per record, even when saturated; a
//!    colliding sibling moves on to a later variation.
//! 6. Bezier conversion keeps every spiral point as a segment endpoint.

use std::f64::consts::{PI, TAU};

use proptest::prelude::*;
use spiral_thread_core::layout::collision::{intersects, PlacedCurve};
use spiral_thread_core::layout::geometry::{
    default_curl_sign, generate_spiral, positions, sample_bezier, to_bezier,
};
use spiral_thread_core::layout::tree::ThreadTree;
use spiral_thread_core::layout::variation::variations;
use spiral_thread_core::{
    BranchRng, GenerationParams, LayoutConfig, LayoutDescriptor, LayoutWarning, MessageRecord,
    PlacementStatus, PointF, SpiralLayouter,
};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Smaller curves keep collision searches cheap without changing behavior.
fn test_config(seed: u64) -> LayoutConfig {
    LayoutConfig {
        point_count: 20,
        samples_per_segment: 4,
        branch_rng: BranchRng::Seeded(seed),
        ..LayoutConfig::default()
    }
}

/// Random forest: each record after the first either starts a new root or
/// replies to an earlier record.
fn thread_strategy(max_len: usize) -> impl Strategy<Value = Vec<MessageRecord>> {
    prop::collection::vec((any::<bool>(), any::<prop::sample::Index>()), 1..max_len).prop_map(|picks| {
        picks
            .iter()
            .enumerate()
            .map(|(i, (new_root, parent))| {
                let id = 100 + i as i64;
                let parent_id = if i == 0 || (*new_root && i % 3 == 0) {
                    None
                } else {
                    Some(100 + parent.index(i) as i64)
                };
                MessageRecord::new(id, parent_id)
            })
            .collect()
    })
}

fn persisted(records: &[MessageRecord], layouter: &SpiralLayouter) -> Vec<MessageRecord> {
    let result = layouter.layout(records);
    records
        .iter()
        .zip(&result.nodes)
        .map(|(rec, node)| rec.clone().with_descriptor(&node.geometry.descriptor))
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Subtree weights
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn weight_is_one_plus_children(records in thread_strategy(60)) {
        let (tree, _) = ThreadTree::build(&records);
        for (i, node) in tree.nodes.iter().enumerate() {
            let below: usize = node.children.iter().map(|&c| tree.nodes[c].weight).sum();
            prop_assert_eq!(node.weight, 1 + below, "bad weight at node {}", i);
        }
        prop_assert_eq!(tree.total_root_weight(), records.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Root sectors cover the full turn
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn root_sectors_sum_to_full_turn(records in thread_strategy(60)) {
        let (tree, _) = ThreadTree::build(&records);
        let sectors = tree.root_sectors();
        prop_assert_eq!(sectors.len(), tree.roots.len());
        let total: f64 = sectors.iter().map(|s| s.sector).sum();
        prop_assert!((total - TAU).abs() < 1e-9, "sectors sum to {}", total);
        prop_assert!(sectors.iter().all(|s| s.sector > 0.0));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-5. Placement
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn replies_start_on_branch_points(records in thread_strategy(14), seed in any::<u64>()) {
        let layouter = SpiralLayouter::with_config(test_config(seed), 900.0, 700.0);
        let result = layouter.layout(&records);
        prop_assert_eq!(result.nodes.len(), records.len());

        for node in &result.nodes {
            let g = &node.geometry;
            prop_assert!(g.allocated_angle > 0.0);
            prop_assert_eq!(g.points.first().map(|p| p.pos()), Some(g.start));
            match node.record.parent_id {
                None => {
                    prop_assert_eq!(g.start, layouter.canvas().center());
                    prop_assert!(g.branch_index.is_none());
                }
                Some(pid) => {
                    let parent = result.get(pid).unwrap();
                    let idx = g.branch_index.unwrap();
                    prop_assert_eq!(g.start, parent.geometry.points[idx].pos());
                    prop_assert_eq!(g.depth, parent.geometry.depth + 1);
                }
            }
        }
    }

    #[test]
    fn replay_is_deterministic(records in thread_strategy(10), seed in any::<u64>()) {
        let layouter = SpiralLayouter::with_config(test_config(seed), 900.0, 700.0);
        let stored = persisted(&records, &layouter);

        // Different branch entropy must not matter once everything is stored.
        let other = SpiralLayouter::new(900.0, 700.0);
        let a = layouter.layout(&stored);
        let b = other.layout(&stored);
        for (x, y) in a.nodes.iter().zip(&b.nodes) {
            prop_assert_eq!(&x.geometry.points, &y.geometry.points);
            prop_assert_eq!(x.status, PlacementStatus::Replayed);
            prop_assert!(!x.needs_persist);
        }
        prop_assert!(a.persistable_layouts().unwrap().is_empty());
    }
}

#[test]
fn replay_matches_fresh_geometry() {
    let records: Vec<_> = (1..=6)
        .map(|i| MessageRecord::new(i, if i == 1 { None } else { Some((i - 1) / 2 + 1) }))
        .collect();
    let layouter = SpiralLayouter::with_config(test_config(3), 800.0, 800.0);
    let fresh = layouter.layout(&records);
    let stored = persisted(&records, &layouter);
    let replayed = layouter.layout(&stored);

    for (f, r) in fresh.nodes.iter().zip(&replayed.nodes) {
        assert_eq!(f.geometry.points, r.geometry.points);
        assert_eq!(f.geometry.params, r.geometry.params);
    }
}

#[test]
fn partial_replay_keeps_children_attached() {
    // Parent searched fresh, child replayed from an old descriptor: the child
    // still starts on the parent's current branch point.
    let records = vec![MessageRecord::new(1, None), MessageRecord::new(2, Some(1))];
    let layouter = SpiralLayouter::with_config(test_config(9), 800.0, 800.0);
    let stored = persisted(&records, &layouter);
    let mixed = vec![records[0].clone(), stored[1].clone()];

    let mut moved = layouter.clone();
    moved.set_canvas_size(1200.0, 900.0);
    let result = moved.layout(&mixed);
    let parent = &result.nodes[0];
    let child = &result.nodes[1];
    assert!(parent.needs_persist);
    assert_eq!(child.status, PlacementStatus::Replayed);
    let idx = child.geometry.branch_index.unwrap();
    assert_eq!(child.geometry.start, parent.geometry.points[idx].pos());
}

#[test]
fn many_replies_on_one_parent_complete() {
    let mut records = vec![MessageRecord::new(1, None)];
    records.extend((2..=24).map(|i| MessageRecord::new(i, Some(1))));
    let layouter = SpiralLayouter::with_config(test_config(5), 500.0, 500.0);
    let result = layouter.layout(&records);

    assert_eq!(result.nodes.len(), records.len());
    assert!(result.nodes.iter().all(|n| n.needs_persist));
    assert_eq!(result.persistable_layouts().unwrap().len(), records.len());
}

#[test]
fn crossing_sibling_moves_to_later_variation() {
    // Root 1 is stored pointing into root 2's sector and curling against
    // it, so root 2's preferred spiral crosses it.
    let cfg = LayoutConfig { branch_rng: BranchRng::Seeded(1), ..LayoutConfig::default() };
    let layouter = SpiralLayouter::with_config(cfg.clone(), 800.0, 800.0);
    let curl = default_curl_sign(2);
    let stored = LayoutDescriptor {
        offset_x: 0.0,
        offset_y: 0.0,
        start_angle: PI + f64::from(curl) * 0.6,
        overrides: GenerationParams { curvature_sign: -curl, ..GenerationParams::default() },
    };
    let records = vec![MessageRecord::new(1, None).with_descriptor(&stored), MessageRecord::new(2, None)];
    let result = layouter.layout(&records);

    let first = &result.nodes[0];
    assert_eq!(first.status, PlacementStatus::Replayed);
    let placed = [PlacedCurve::new(1, &positions(&first.geometry.points), cfg.samples_per_segment)];

    let second = &result.nodes[1];
    let preferred = variations(2)[0];
    let start_angle = second.geometry.descriptor.start_angle;
    let blocked = generate_spiral(layouter.canvas().center(), start_angle, 1.0, 2, &preferred, &cfg);
    assert!(intersects(&positions(&blocked.points), &placed, cfg.skip_prefix, cfg.samples_per_segment));

    assert!(matches!(second.status, PlacementStatus::Clear { attempts } if attempts > 1));
    assert_ne!(second.geometry.params, preferred);
    assert!(!intersects(
        &positions(&second.geometry.points),
        &placed,
        cfg.skip_prefix,
        cfg.samples_per_segment
    ));
}

#[test]
fn shared_origin_saturates_later_roots() {
    // With no prefix skipped, every curve leaving the shared center touches
    // the ones already there, so no variation is ever free.
    let cfg = LayoutConfig { skip_prefix: 0, ..test_config(4) };
    let records: Vec<_> = (1..=4).map(|i| MessageRecord::new(i, None)).collect();
    let layouter = SpiralLayouter::with_config(cfg, 600.0, 600.0);
    let result = layouter.layout(&records);

    assert_eq!(result.nodes.len(), records.len());
    assert_eq!(result.nodes[0].status, PlacementStatus::Clear { attempts: 1 });
    for node in &result.nodes[1..] {
        let id = node.record.id;
        assert_eq!(node.status, PlacementStatus::BestEffort);
        assert!(result.warnings.contains(&LayoutWarning::BestEffort { id }));
        assert_eq!(Some(&node.geometry.params), variations(id).last());
        assert!(node.needs_persist);
    }
    assert_eq!(result.persistable_layouts().unwrap().len(), records.len());
}

#[test]
fn orphans_share_the_full_turn() {
    let records = vec![
        MessageRecord::new(1, None),
        MessageRecord::new(2, Some(1)),
        MessageRecord::new(3, Some(77)),
    ];
    let layouter = SpiralLayouter::with_config(test_config(1), 800.0, 800.0);
    let result = layouter.layout(&records);

    assert!(result.warnings.contains(&LayoutWarning::OrphanPromoted { id: 3, parent_id: 77 }));
    let orphan = result.get(3).unwrap();
    assert_eq!(orphan.geometry.start, layouter.canvas().center());
    assert_eq!(orphan.geometry.depth, 1);
    let roots = result.get(1).unwrap().geometry.allocated_angle + orphan.geometry.allocated_angle;
    assert!((roots - TAU).abs() < 1e-12);
}

#[test]
fn bad_descriptor_only_affects_its_node() {
    let records = vec![MessageRecord::new(1, None), MessageRecord::new(2, Some(1))];
    let layouter = SpiralLayouter::with_config(test_config(2), 800.0, 800.0);
    let mut stored = persisted(&records, &layouter);
    stored[1].layout_data = Some(serde_json::Value::String("{broken".to_string()));

    let result = layouter.layout(&stored);
    assert_eq!(result.nodes[0].status, PlacementStatus::Replayed);
    assert!(result.nodes[1].needs_persist);
    assert!(matches!(result.warnings[0], LayoutWarning::InvalidDescriptor { id: 2, .. }));
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Bezier conversion keeps endpoints
// ═════════════════════════════════════════════════════════════════════════

fn polyline_strategy() -> impl Strategy<Value = Vec<PointF>> {
    prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 2..40)
        .prop_map(|pts| pts.into_iter().map(|(x, y)| PointF { x, y }).collect())
}

proptest! {
    #[test]
    fn bezier_passes_through_points(points in polyline_strategy(), spp in 1usize..10) {
        let segments = to_bezier(&points);
        prop_assert_eq!(segments.len(), points.len() - 1);
        for (i, seg) in segments.iter().enumerate() {
            prop_assert_eq!(seg.p0, points[i]);
            prop_assert_eq!(seg.p3, points[i + 1]);
        }

        let samples = sample_bezier(&points, spp);
        prop_assert_eq!(samples.len(), (points.len() - 1) * spp + 1);
        for (i, p) in points.iter().enumerate() {
            prop_assert_eq!(samples[i * spp], *p);
        }
    }
}
