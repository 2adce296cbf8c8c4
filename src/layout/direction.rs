// Direction scorer for child branches.
//
// Candidate angles fan out around the outward normal of the parent curve at
// the branch point. Each candidate is scored by how much empty space lies a
// fixed probe distance along it, then one is drawn with probability
// proportional to its score.

use std::f64::consts::FRAC_PI_2;

use rand::Rng;

use super::geometry::SpiralPoint;
use super::{Canvas, LayoutConfig, PointF};

/// Outward direction at a branch point: perpendicular to the local tangent,
/// on the side away from the parent's curl.
pub fn outward_angle(branch: &SpiralPoint, parent_curvature: f64) -> f64 {
    let curl = if parent_curvature < 0.0 { -1.0 } else { 1.0 };
    branch.angle - curl * FRAC_PI_2
}

/// Candidate angles spread symmetrically around `base`.
pub fn candidate_angles(base: f64, allocated_angle: f64, cfg: &LayoutConfig) -> Vec<f64> {
    let count = cfg.candidate_count.max(1);
    if count == 1 {
        return vec![base];
    }
    let spread = allocated_angle.min(cfg.max_branch_spread).max(0.0);
    (0..count)
        .map(|k| base - spread / 2.0 + spread * k as f64 / (count - 1) as f64)
        .collect()
}

/// Free-space score for each candidate.
///
/// The probe point sits `probe_distance` along the candidate from `from`;
/// its score is the distance to the nearest occupied point. Probes outside
/// the canvas inset by the margin are penalized.
pub fn score_candidates(
    from: PointF,
    candidates: &[f64],
    probe_distance: f64,
    occupied: &[PointF],
    canvas: &Canvas,
    cfg: &LayoutConfig,
) -> Vec<f64> {
    candidates
        .iter()
        .map(|&angle| {
            let probe = PointF {
                x: from.x + probe_distance * angle.cos(),
                y: from.y + probe_distance * angle.sin(),
            };
            let clearance = occupied
                .iter()
                .map(|p| p.dist(probe))
                .fold(f64::INFINITY, f64::min);
            let mut score = if clearance.is_finite() { clearance } else { probe_distance };
            if !canvas.contains_inset(probe, cfg.canvas_margin) {
                score *= cfg.out_of_bounds_penalty;
            }
            score
        })
        .collect()
}

/// Score-weighted random choice. Falls back to the best score when the
/// weights carry no information.
pub fn choose_weighted<R: Rng + ?Sized>(candidates: &[f64], scores: &[f64], rng: &mut R) -> f64 {
    let Some(&fallback) = candidates.first() else {
        return 0.0;
    };
    let weights: Vec<f64> = scores
        .iter()
        .map(|&s| if s.is_finite() && s > 0.0 { s } else { 0.0 })
        .collect();
    let total: f64 = weights.iter().sum();

    if total <= 0.0 || !total.is_finite() {
        return candidates
            .iter()
            .zip(scores)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&angle, _)| angle)
            .unwrap_or(fallback);
    }

    let mut pick = rng.random::<f64>() * total;
    for (&angle, &w) in candidates.iter().zip(&weights) {
        if pick < w {
            return angle;
        }
        pick -= w;
    }
    // Rounding left a sliver past the end; take the last weighted candidate.
    candidates
        .iter()
        .zip(&weights)
        .rev()
        .find(|(_, w)| **w > 0.0)
        .map(|(&angle, _)| angle)
        .unwrap_or(fallback)
}

/// Full scorer: candidates around the outward normal, scored, then drawn.
#[allow(clippy::too_many_arguments)]
pub fn pick_branch_angle<R: Rng + ?Sized>(
    branch: &SpiralPoint,
    parent_curvature: f64,
    allocated_angle: f64,
    scale: f64,
    occupied: &[PointF],
    canvas: &Canvas,
    cfg: &LayoutConfig,
    rng: &mut R,
) -> f64 {
    let base = outward_angle(branch, parent_curvature);
    let candidates = candidate_angles(base, allocated_angle, cfg);
    let scores = score_candidates(
        branch.pos(),
        &candidates,
        cfg.probe_distance * scale,
        occupied,
        canvas,
        cfg,
    );
    choose_weighted(&candidates, &scores, rng)
}
