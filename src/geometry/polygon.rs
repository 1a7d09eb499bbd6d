//! Oriented rectangles and convex polygon overlap.
//!
//! Overlap is computed with Sutherland-Hodgman clipping. Both inputs must be
//! convex and wound counter-clockwise, which holds for every rectangle built
//! by [`oriented_corners`].

use glam::DVec2;

/// Overlaps with an area below this are treated as touching, not overlapping.
const AREA_EPSILON: f64 = 1e-12;

/// Area and centroid of the region shared by two particles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    /// Area of the overlap polygon.
    pub area: f64,
    /// Centroid of the overlap polygon.
    pub centroid: DVec2,
}

/// Corners of a `size` rectangle centered on `center` and rotated by
/// `rotation` radians, in counter-clockwise order starting at the
/// (+x, +y) corner of the unrotated box.
pub fn oriented_corners(center: DVec2, size: DVec2, rotation: f64) -> [DVec2; 4] {
    let half = size * 0.5;
    let turn = DVec2::from_angle(rotation);
    [
        DVec2::new(half.x, half.y),
        DVec2::new(-half.x, half.y),
        DVec2::new(-half.x, -half.y),
        DVec2::new(half.x, -half.y),
    ]
    .map(|corner| center + turn.rotate(corner))
}

/// Clip `subject` against the convex, counter-clockwise polygon `clip`.
///
/// Returns the vertices of the intersection, which is empty when the
/// polygons do not overlap.
pub fn clip_convex(subject: &[DVec2], clip: &[DVec2]) -> Vec<DVec2> {
    let mut output = subject.to_vec();

    for (i, &start) in clip.iter().enumerate() {
        if output.is_empty() {
            break;
        }
        let end = clip[(i + 1) % clip.len()];
        let edge = end - start;

        let input = std::mem::take(&mut output);
        let mut previous = input[input.len() - 1];
        let mut previous_inside = edge.perp_dot(previous - start) >= 0.0;

        for &current in &input {
            let inside = edge.perp_dot(current - start) >= 0.0;
            if inside != previous_inside {
                output.push(line_crossing(previous, current, start, edge));
            }
            if inside {
                output.push(current);
            }
            previous = current;
            previous_inside = inside;
        }
    }

    output
}

/// Point where segment `p -> q` crosses the infinite line through `start`
/// with direction `edge`. The endpoints lie on opposite sides.
fn line_crossing(p: DVec2, q: DVec2, start: DVec2, edge: DVec2) -> DVec2 {
    let side_p = edge.perp_dot(p - start);
    let side_q = edge.perp_dot(q - start);
    let t = side_p / (side_p - side_q);
    p + (q - p) * t
}

/// Area and centroid of a simple polygon, or `None` if it is degenerate.
pub fn polygon_overlap(points: &[DVec2]) -> Option<Overlap> {
    if points.len() < 3 {
        return None;
    }

    // Work relative to the first vertex to keep the shoelace sums small.
    let origin = points[0];
    let mut twice_area = 0.0;
    let mut weighted = DVec2::ZERO;
    for i in 0..points.len() {
        let p = points[i] - origin;
        let q = points[(i + 1) % points.len()] - origin;
        let cross = p.perp_dot(q);
        twice_area += cross;
        weighted += (p + q) * cross;
    }

    if twice_area.abs() < AREA_EPSILON {
        return None;
    }

    Some(Overlap {
        area: twice_area.abs() * 0.5,
        centroid: origin + weighted / (3.0 * twice_area),
    })
}

/// Overlap of two oriented rectangles given by their corners.
pub fn overlap(a: &[DVec2; 4], b: &[DVec2; 4]) -> Option<Overlap> {
    polygon_overlap(&clip_convex(a, b))
}
