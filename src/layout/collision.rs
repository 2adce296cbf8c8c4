// Curve-vs-curve collision oracle.
//
// Curves are compared as densely sampled Bezier polylines. A child curve
// starts on its parent, so the first `skip_prefix` point-pairs worth of
// samples are ignored on both sides of every test.

use super::geometry::sample_bezier;
use super::{PointF, RectF};

/// Cross products smaller than this count as parallel.
const PARALLEL_EPSILON: f64 = 1e-10;

/// Run of consecutive samples with its bounds; `end` is inclusive and is
/// the next span's `start`.
#[derive(Debug, Copy, Clone)]
struct Span {
    start: usize,
    end: usize,
    bounds: RectF,
}

fn spans(samples: &[PointF], chunk: usize) -> Vec<Span> {
    let chunk = chunk.max(1);
    let mut out = Vec::with_capacity(samples.len() / chunk + 1);
    let mut start = 0;
    while start + 1 < samples.len() {
        let end = (start + chunk).min(samples.len() - 1);
        if let Some(bounds) = RectF::bounding(&samples[start..=end]) {
            out.push(Span { start, end, bounds });
        }
        start = end;
    }
    out
}

/// A curve already accepted into the layout, with its samples cached.
#[derive(Debug, Clone)]
pub struct PlacedCurve {
    pub id: i64,
    samples: Vec<PointF>,
    spans: Vec<Span>,
    bounds: Option<RectF>,
}

impl PlacedCurve {
    /// Sample `points` once and keep the polyline for later tests.
    pub fn new(id: i64, points: &[PointF], samples_per_segment: usize) -> Self {
        let samples = sample_bezier(points, samples_per_segment);
        let spans = spans(&samples, samples_per_segment);
        let bounds = RectF::bounding(&samples);
        Self { id, samples, spans, bounds }
    }
}

/// True if segment `a1-a2` crosses segment `b1-b2`.
///
/// Solves `a1 + t*r = b1 + u*s`; both parameters must lie in `[0, 1]`.
/// Near-parallel pairs never intersect.
pub fn segments_intersect(a1: PointF, a2: PointF, b1: PointF, b2: PointF) -> bool {
    let r = a2.sub(a1);
    let s = b2.sub(b1);
    let denom = r.cross(s);
    if denom.abs() < PARALLEL_EPSILON {
        return false;
    }
    let qp = b1.sub(a1);
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

fn polylines_intersect(a: &[PointF], b: &[PointF]) -> bool {
    for wa in a.windows(2) {
        for wb in b.windows(2) {
            if segments_intersect(wa[0], wa[1], wb[0], wb[1]) {
                return true;
            }
        }
    }
    false
}

/// Segment pairs are only tested where span bounds overlap. Segments before
/// `skip` are ignored on both sides.
fn spans_intersect(a: &[PointF], a_spans: &[Span], b: &[PointF], b_spans: &[Span], skip: usize) -> bool {
    for sa in a_spans.iter().filter(|s| s.end > skip) {
        let a_from = sa.start.max(skip);
        for sb in b_spans.iter().filter(|s| s.end > skip) {
            if !sa.bounds.overlaps(&sb.bounds) {
                continue;
            }
            let b_from = sb.start.max(skip);
            if polylines_intersect(&a[a_from..=sa.end], &b[b_from..=sb.end]) {
                return true;
            }
        }
    }
    false
}

/// Test a candidate point sequence against every placed curve.
///
/// Returns on the first hit. A candidate with fewer than two points never
/// intersects anything.
pub fn intersects(
    candidate: &[PointF],
    placed: &[PlacedCurve],
    skip_prefix: usize,
    samples_per_segment: usize,
) -> bool {
    if candidate.len() < 2 || placed.is_empty() {
        return false;
    }
    let skip = skip_prefix * samples_per_segment.max(1);
    let samples = sample_bezier(candidate, samples_per_segment);
    if samples.len() < skip + 2 {
        return false;
    }
    let Some(tail_bounds) = RectF::bounding(&samples[skip..]) else {
        return false;
    };
    let candidate_spans = spans(&samples, samples_per_segment);

    placed.iter().any(|curve| {
        if curve.samples.len() < skip + 2 {
            return false;
        }
        // Whole-curve bounds are a superset of the tail's, fine for rejection.
        match curve.bounds {
            Some(b) if !b.overlaps(&tail_bounds) => false,
            _ => spans_intersect(&samples, &candidate_spans, &curve.samples, &curve.spans, skip),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> PointF {
        PointF { x, y }
    }

    fn line(from: PointF, to: PointF, n: usize) -> Vec<PointF> {
        (0..=n)
            .map(|i| {
                let t = i as f64 / n as f64;
                p(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t)
            })
            .collect()
    }

    #[test]
    fn test_crossing_diagonals() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(10.0, 0.0)));
    }

    #[test]
    fn test_parallel_horizontals() {
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(0.0, 5.0), p(10.0, 5.0)));
    }

    #[test]
    fn test_vertical_through_midpoint() {
        assert!(segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(5.0, -5.0), p(5.0, 5.0)));
    }

    #[test]
    fn test_disjoint_segments() {
        assert!(!segments_intersect(p(0.0, 0.0), p(1.0, 1.0), p(5.0, 0.0), p(6.0, -3.0)));
    }

    #[test]
    fn test_collinear_overlap_counts_as_parallel() {
        assert!(!segments_intersect(p(0.0, 0.0), p(10.0, 0.0), p(5.0, 0.0), p(15.0, 0.0)));
    }

    #[test]
    fn test_curve_crossing_detected() {
        let placed = vec![PlacedCurve::new(1, &line(p(-50.0, 0.0), p(50.0, 0.0), 20), 8)];
        let candidate = line(p(3.3, -47.1), p(3.3, 52.9), 20);
        assert!(intersects(&candidate, &placed, 3, 8));
    }

    #[test]
    fn test_far_curves_do_not_intersect() {
        let placed = vec![PlacedCurve::new(1, &line(p(-50.0, 0.0), p(50.0, 0.0), 20), 8)];
        let candidate = line(p(200.0, -50.0), p(200.0, 50.0), 20);
        assert!(!intersects(&candidate, &placed, 3, 8));
    }

    #[test]
    fn test_shared_start_is_skipped() {
        // Both curves leave the same branch point and diverge.
        let placed = vec![PlacedCurve::new(1, &line(p(0.0, 0.0), p(100.0, 0.0), 20), 8)];
        let candidate = line(p(0.0, 0.0), p(0.0, 100.0), 20);
        assert!(!intersects(&candidate, &placed, 3, 8));
        // Without the skip the shared start point is a hit.
        assert!(intersects(&candidate, &placed, 0, 8));
    }

    #[test]
    fn test_short_candidate_never_intersects() {
        let placed = vec![PlacedCurve::new(1, &line(p(-50.0, 0.0), p(50.0, 0.0), 20), 8)];
        assert!(!intersects(&[p(0.0, 0.0)], &placed, 0, 8));
        assert!(!intersects(&[], &placed, 0, 8));
    }

    #[test]
    fn test_spans_cover_every_segment() {
        let samples = line(p(0.0, 0.0), p(10.0, 0.0), 10);
        let sp = spans(&samples, 4);
        assert_eq!(sp.len(), 3);
        assert_eq!((sp[0].start, sp[0].end), (0, 4));
        assert_eq!((sp[1].start, sp[1].end), (4, 8));
        assert_eq!((sp[2].start, sp[2].end), (8, 10));
        assert!(spans(&samples[..1], 4).is_empty());
    }

    #[test]
    fn test_no_placed_curves() {
        let candidate = line(p(0.0, 0.0), p(10.0, 10.0), 4);
        assert!(!intersects(&candidate, &[], 0, 8));
    }
}
