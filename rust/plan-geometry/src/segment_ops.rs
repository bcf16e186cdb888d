// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment primitives shared by wall extraction and the coordinate mapper

use crate::types::Point2D;

/// Epsilon-tolerant vertex equality
///
/// Compares each axis independently: a difference of exactly `epsilon`
/// still counts as the same vertex.
pub fn points_coincide(a: &Point2D, b: &Point2D, epsilon: f64) -> bool {
    (a.x - b.x).abs() <= epsilon && (a.y - b.y).abs() <= epsilon
}

/// Whether two edges cover the same span, in either traversal order
///
/// Adjacent rooms walk a shared boundary in opposite winding directions,
/// so `(a0, a1)` matches both `(b0, b1)` and `(b1, b0)`.
pub fn edges_match(a: (&Point2D, &Point2D), b: (&Point2D, &Point2D), epsilon: f64) -> bool {
    let same = points_coincide(a.0, b.0, epsilon) && points_coincide(a.1, b.1, epsilon);
    let reversed = points_coincide(a.0, b.1, epsilon) && points_coincide(a.1, b.0, epsilon);
    same || reversed
}

/// Parameter of the orthogonal projection of `point` onto the line through the segment
///
/// `0` is `start`, `1` is `end`; values outside `[0, 1]` lie beyond the
/// endpoints. Degenerate segments project everything onto `start`.
pub fn project_onto_segment(point: &Point2D, start: &Point2D, end: &Point2D) -> f64 {
    let d = start.vector_to(end);
    let length_sq = d.norm_squared();
    if length_sq < 1e-12 {
        return 0.0;
    }
    start.vector_to(point).dot(&d) / length_sq
}

/// Calculate perpendicular distance from a point to a line segment
pub fn point_to_segment_distance(point: &Point2D, start: &Point2D, end: &Point2D) -> f64 {
    let t = project_onto_segment(point, start, end).clamp(0.0, 1.0);
    point.distance_to(&start.lerp(end, t))
}

/// Whether `point` lies on the segment strictly between its endpoints
///
/// Points within `epsilon` of either endpoint are not interior.
pub fn point_on_segment_interior(
    point: &Point2D,
    start: &Point2D,
    end: &Point2D,
    epsilon: f64,
) -> bool {
    if points_coincide(point, start, epsilon) || points_coincide(point, end, epsilon) {
        return false;
    }
    let t = project_onto_segment(point, start, end);
    if t <= 0.0 || t >= 1.0 {
        return false;
    }
    point_to_segment_distance(point, start, end) <= epsilon
}

/// Check if two segments are collinear (parallel and on the same line)
///
/// `sin_tolerance` bounds the sine of the angle between the two directions;
/// `distance_tolerance` bounds how far `b`'s endpoints may sit from `a`'s line.
pub fn are_collinear(
    a: (&Point2D, &Point2D),
    b: (&Point2D, &Point2D),
    sin_tolerance: f64,
    distance_tolerance: f64,
) -> bool {
    let da = a.0.vector_to(a.1);
    let db = b.0.vector_to(b.1);
    let (la, lb) = (da.norm(), db.norm());
    if la < 1e-12 || lb < 1e-12 {
        return false;
    }

    // |sin(angle)| via the 2D cross product
    let sin = (da.x * db.y - da.y * db.x).abs() / (la * lb);
    if sin > sin_tolerance {
        return false;
    }

    line_distance(b.0, a.0, a.1) <= distance_tolerance
        && line_distance(b.1, a.0, a.1) <= distance_tolerance
}

/// Distance from a point to the infinite line through `start`/`end`
fn line_distance(point: &Point2D, start: &Point2D, end: &Point2D) -> f64 {
    let d = start.vector_to(end);
    let len = d.norm();
    if len < 1e-12 {
        return point.distance_to(start);
    }
    let v = start.vector_to(point);
    (d.x * v.y - d.y * v.x).abs() / len
}

/// Remove consecutive near-duplicate vertices and a closing vertex equal to the first
pub fn collapse_vertices(points: &[Point2D], epsilon: f64) -> Vec<Point2D> {
    let mut out: Vec<Point2D> = Vec::with_capacity(points.len());
    for p in points {
        match out.last() {
            Some(last) if points_coincide(last, p, epsilon) => {}
            _ => out.push(*p),
        }
    }
    while out.len() > 1 && points_coincide(&out[0], &out[out.len() - 1], epsilon) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 0.5;

    #[test]
    fn test_points_coincide_at_epsilon_boundary() {
        let a = Point2D::new(0.0, 0.0);
        assert!(points_coincide(&a, &Point2D::new(EPS, 0.0), EPS));
        assert!(points_coincide(&a, &Point2D::new(-EPS, EPS), EPS));
        assert!(!points_coincide(&a, &Point2D::new(EPS + 1e-9, 0.0), EPS));
        assert!(!points_coincide(&a, &Point2D::new(0.0, EPS + 1e-9), EPS));
    }

    #[test]
    fn test_edges_match_either_direction() {
        let (a0, a1) = (Point2D::new(10.0, 0.0), Point2D::new(10.0, 10.0));
        let (b0, b1) = (Point2D::new(10.2, 10.0), Point2D::new(10.0, -0.3));
        assert!(edges_match((&a0, &a1), (&b0, &b1), EPS));
        assert!(edges_match((&a0, &a1), (&a0, &a1), EPS));
        let c1 = Point2D::new(10.0, 12.0);
        assert!(!edges_match((&a0, &a1), (&a0, &c1), EPS));
    }

    #[test]
    fn test_point_to_segment_distance() {
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(10.0, 0.0);
        let point = Point2D::new(5.0, 5.0);

        let dist = point_to_segment_distance(&point, &start, &end);
        assert_relative_eq!(dist, 5.0);

        // Beyond the end clamps to the endpoint
        let far = Point2D::new(13.0, 4.0);
        assert_relative_eq!(point_to_segment_distance(&far, &start, &end), 5.0);
    }

    #[test]
    fn test_point_on_segment_interior() {
        let start = Point2D::new(0.0, 0.0);
        let end = Point2D::new(20.0, 0.0);
        assert!(point_on_segment_interior(&Point2D::new(10.0, 0.2), &start, &end, EPS));
        assert!(!point_on_segment_interior(&Point2D::new(0.3, 0.0), &start, &end, EPS));
        assert!(!point_on_segment_interior(&Point2D::new(25.0, 0.0), &start, &end, EPS));
        assert!(!point_on_segment_interior(&Point2D::new(10.0, 3.0), &start, &end, EPS));
    }

    #[test]
    fn test_are_collinear() {
        let (a0, a1) = (Point2D::new(0.0, 0.0), Point2D::new(10.0, 0.0));
        let (b0, b1) = (Point2D::new(10.0, 0.0), Point2D::new(20.0, 0.0));
        assert!(are_collinear((&a0, &a1), (&b0, &b1), 0.01, EPS));

        // Parallel but offset
        let (c0, c1) = (Point2D::new(10.0, 5.0), Point2D::new(20.0, 5.0));
        assert!(!are_collinear((&a0, &a1), (&c0, &c1), 0.01, EPS));

        // Perpendicular
        let (d0, d1) = (Point2D::new(10.0, 0.0), Point2D::new(10.0, 10.0));
        assert!(!are_collinear((&a0, &a1), (&d0, &d1), 0.01, EPS));
    }

    #[test]
    fn test_collapse_vertices() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(0.1, 0.0),
            Point2D::new(10.0, 0.0),
            Point2D::new(10.0, 10.0),
            Point2D::new(0.0, 10.0),
            Point2D::new(0.0, 0.2),
        ];
        let collapsed = collapse_vertices(&points, EPS);
        assert_eq!(collapsed.len(), 4);
        assert_eq!(collapsed[0], Point2D::new(0.0, 0.0));
    }
}
