// Spiral geometry kernel.
//
// - seeded_random: fixed (seed, index) -> [0,1) stream, SplitMix64 finalizer
// - generate_spiral: integrates a linearly rotating tangent from an origin
// - to_bezier: Catmull-Rom -> cubic Bezier, one segment per point pair
// - sample_bezier: dense polyline for collision tests only
//
// Everything here is pure: same inputs always give the same points.

use serde::Serialize;

use super::{LayoutConfig, PointF};
use super::variation::GenerationParams;

/// Stream index for the length jitter.
pub const STREAM_LENGTH: u32 = 0;
/// Stream index for the default curl sign.
pub const STREAM_CURL: u32 = 1;
/// Stream index for the curvature jitter.
pub const STREAM_CURVATURE: u32 = 2;
/// Stream index for the branch fraction jitter of a child.
pub const STREAM_BRANCH: u32 = 3;
/// Stream index used to seed the per-node branch angle rng.
pub const STREAM_ANGLE_RNG: u32 = 4;

/// Deterministic pseudo-random value in `[0, 1)` for `(seed, index)`.
///
/// SplitMix64 applied to `seed + (index + 1) * 0x9E3779B97F4A7C15`
/// (wrapping), keeping the top 53 bits. Independent of call order.
pub fn seeded_random(seed: i64, index: u32) -> f64 {
    let mut z = (seed as u64)
        .wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Curl sign a seed prefers when nothing overrides it.
pub fn default_curl_sign(seed: i64) -> i8 {
    if seeded_random(seed, STREAM_CURL) < 0.5 { -1 } else { 1 }
}

/// One sample of a spiral: position, tangent angle and progress `t` in 0..=1.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SpiralPoint {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
    pub t: f64,
}

impl SpiralPoint {
    pub fn pos(&self) -> PointF {
        PointF { x: self.x, y: self.y }
    }
}

/// Raw output of `generate_spiral`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpiralPath {
    pub points: Vec<SpiralPoint>,
    /// Signed total rotation of the tangent over the whole path (radians).
    pub curvature: f64,
    pub length: f64,
}

/// Cubic Bezier segment: start, two control points, end.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct BezierSegment {
    pub p0: PointF,
    pub c1: PointF,
    pub c2: PointF,
    pub p3: PointF,
}

impl BezierSegment {
    pub fn eval(&self, t: f64) -> PointF {
        let mt = 1.0 - t;
        let a = mt * mt * mt;
        let b = 3.0 * mt * mt * t;
        let c = 3.0 * mt * t * t;
        let d = t * t * t;
        PointF {
            x: a * self.p0.x + b * self.c1.x + c * self.c2.x + d * self.p3.x,
            y: a * self.p0.y + b * self.c1.y + c * self.c2.y + d * self.p3.y,
        }
    }
}

/// Generate the point sequence of one spiral.
///
/// `params` carries the curl override and the length/curvature/angle knobs
/// used by the variation search. A `curvature_sign` of 0 means "use the
/// seed's default curl".
pub fn generate_spiral(
    origin: PointF,
    start_angle: f64,
    scale: f64,
    seed: i64,
    params: &GenerationParams,
    cfg: &LayoutConfig,
) -> SpiralPath {
    let n = cfg.point_count.max(1);

    let length = cfg.base_length
        * scale
        * (0.8 + 0.4 * seeded_random(seed, STREAM_LENGTH))
        * params.length_scale;

    let sign = if params.curvature_sign == 0 {
        default_curl_sign(seed)
    } else {
        params.curvature_sign.signum()
    };
    let curvature = f64::from(sign)
        * cfg.base_curvature
        * (0.7 + 0.6 * seeded_random(seed, STREAM_CURVATURE))
        * params.curvature_scale;

    let step = length / n as f64;
    let base = start_angle + params.angle_offset;

    let mut points = Vec::with_capacity(n + 1);
    let mut pos = origin;
    for i in 0..=n {
        let t = i as f64 / n as f64;
        let angle = base + curvature * t;
        points.push(SpiralPoint { x: pos.x, y: pos.y, angle, t });
        pos = PointF {
            x: pos.x + step * angle.cos(),
            y: pos.y + step * angle.sin(),
        };
    }

    SpiralPath { points, curvature, length }
}

/// Convert a polyline into a smooth curve through every point.
/// Fewer than two points produce no segments.
pub fn to_bezier(points: &[PointF]) -> Vec<BezierSegment> {
    if points.len() < 2 {
        return Vec::new();
    }
    let last = points.len() - 1;
    (0..last)
        .map(|i| {
            let p0 = points[i.saturating_sub(1)];
            let p1 = points[i];
            let p2 = points[i + 1];
            let p3 = points[(i + 2).min(last)];
            BezierSegment {
                p0: p1,
                c1: PointF {
                    x: p1.x + (p2.x - p0.x) / 6.0,
                    y: p1.y + (p2.y - p0.y) / 6.0,
                },
                c2: PointF {
                    x: p2.x - (p3.x - p1.x) / 6.0,
                    y: p2.y - (p3.y - p1.y) / 6.0,
                },
                p3: p2,
            }
        })
        .collect()
}

/// Densify the Bezier curve through `points` into a polyline.
///
/// Segment boundaries are emitted once. The first and last samples are the
/// input endpoints exactly.
pub fn sample_bezier(points: &[PointF], samples_per_segment: usize) -> Vec<PointF> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let spp = samples_per_segment.max(1);
    let segments = to_bezier(points);

    let mut out = Vec::with_capacity(segments.len() * spp + 1);
    for (k, seg) in segments.iter().enumerate() {
        // Boundary point already pushed as the previous segment's end.
        let first = if k == 0 { 0 } else { 1 };
        for s in first..=spp {
            out.push(seg.eval(s as f64 / spp as f64));
        }
    }
    out
}

/// Positions of a spiral's points.
pub fn positions(points: &[SpiralPoint]) -> Vec<PointF> {
    points.iter().map(SpiralPoint::pos).collect()
}
