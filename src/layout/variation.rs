// Parameter variation search.
//
// When a fresh spiral collides with curves already on the canvas, retry with
// alternate generation parameters in a fixed preference order. The first
// collision-free spiral wins; if none is free the last one tried is kept.

use serde::{Deserialize, Serialize};

use super::collision::{intersects, PlacedCurve};
use super::geometry::{default_curl_sign, generate_spiral, positions, SpiralPath};
use super::{LayoutConfig, PointF};

const LENGTH_SCALES: [f64; 5] = [1.0, 0.8, 0.65, 0.5, 0.35];
const CURVATURE_SCALES: [f64; 4] = [1.0, 0.75, 0.5, 0.3];
const ANGLE_OFFSETS: [f64; 15] = [
    0.0, 0.25, -0.25, 0.5, -0.5, 0.8, -0.8, 1.2, -1.2, 1.7, -1.7, 2.3, -2.3, 2.8, -2.8,
];

/// Knobs that turn a seed into one concrete spiral.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    /// +1 or -1; 0 defers to the seed's default curl.
    pub curvature_sign: i8,
    pub length_scale: f64,
    pub curvature_scale: f64,
    /// Added to the start angle (radians).
    pub angle_offset: f64,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            curvature_sign: 0,
            length_scale: 1.0,
            curvature_scale: 1.0,
            angle_offset: 0.0,
        }
    }
}

/// All variations for `seed`, most preferred first.
///
/// Order: curl (preferred, opposite) > length scale > curvature scale >
/// angle offset, with smaller offsets before wider ones.
pub fn variations(seed: i64) -> Vec<GenerationParams> {
    let preferred = default_curl_sign(seed);
    let mut out =
        Vec::with_capacity(2 * LENGTH_SCALES.len() * CURVATURE_SCALES.len() * ANGLE_OFFSETS.len());
    for curl in [preferred, -preferred] {
        for &length_scale in &LENGTH_SCALES {
            for &curvature_scale in &CURVATURE_SCALES {
                for &angle_offset in &ANGLE_OFFSETS {
                    out.push(GenerationParams {
                        curvature_sign: curl,
                        length_scale,
                        curvature_scale,
                        angle_offset,
                    });
                }
            }
        }
    }
    out
}

/// Result of a variation search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub path: SpiralPath,
    pub params: GenerationParams,
    /// Variations generated before one was accepted (1 = first try).
    pub attempts: usize,
    /// False when every variation collided and the last one was kept.
    pub collision_free: bool,
}

/// Try each variation in order against `placed`.
pub fn search_spiral(
    origin: PointF,
    start_angle: f64,
    scale: f64,
    seed: i64,
    placed: &[PlacedCurve],
    cfg: &LayoutConfig,
) -> SearchOutcome {
    let candidates = variations(seed);
    let mut last: Option<(SpiralPath, GenerationParams)> = None;

    for (i, params) in candidates.iter().enumerate() {
        let path = generate_spiral(origin, start_angle, scale, seed, params, cfg);
        let pts = positions(&path.points);
        if !intersects(&pts, placed, cfg.skip_prefix, cfg.samples_per_segment) {
            return SearchOutcome {
                path,
                params: *params,
                attempts: i + 1,
                collision_free: true,
            };
        }
        last = Some((path, *params));
    }

    // The candidate list is never empty, but stay total anyway.
    let (path, params) = last.unwrap_or_else(|| {
        let params = GenerationParams {
            curvature_sign: default_curl_sign(seed),
            ..GenerationParams::default()
        };
        (generate_spiral(origin, start_angle, scale, seed, &params, cfg), params)
    });
    SearchOutcome {
        path,
        params,
        attempts: candidates.len(),
        collision_free: false,
    }
}
