// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for wall extraction and opening placement

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Identifier of a room shape in the drawing
pub type RoomId = String;

/// Identifier of a derived wall segment
pub type WallId = String;

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: &Point2<f64>) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (other.to_nalgebra() - self.to_nalgebra()).norm()
    }

    /// Vector from `self` to `other`
    pub fn vector_to(&self, other: &Point2D) -> Vector2<f64> {
        other.to_nalgebra() - self.to_nalgebra()
    }

    /// Linear interpolation, `t = 0` is `self`, `t = 1` is `other`
    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        Point2D::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounds in drawing units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounds of a point set, `None` when empty
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2D>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in iter {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// SVG view box: the drawing's declared coordinate window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A view box is usable when every component is finite and the size is positive
    pub fn is_usable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Raster preview dimensions in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RasterSize {
    pub width: u32,
    pub height: u32,
}

impl RasterSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Room shape parsed from the drawing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomPolygon {
    pub id: RoomId,
    /// Canonical room-type key (e.g. `bedroom`), `unknown` when unmapped
    pub room_type: String,
    /// Normalized fill color (lowercase hex without `#`)
    pub fill: Option<String>,
    /// Boundary vertices in drawing units, closing edge implied
    pub points: Vec<Point2D>,
}

impl RoomPolygon {
    pub fn new(id: impl Into<RoomId>, room_type: impl Into<String>, points: Vec<Point2D>) -> Self {
        Self {
            id: id.into(),
            room_type: room_type.into(),
            fill: None,
            points,
        }
    }

    /// Calculate polygon area using shoelace formula
    pub fn calculate_area(points: &[Point2D]) -> f64 {
        let n = points.len();
        if n < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += points[i].x * points[j].y;
            area -= points[j].x * points[i].y;
        }

        (area / 2.0).abs()
    }

    pub fn area(&self) -> f64 {
        Self::calculate_area(&self.points)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.points)
    }

    /// Vertex average, good enough for labeling
    pub fn centroid(&self) -> Option<Point2D> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Some(Point2D::new(sx / n, sy / n))
    }
}

/// A straight boundary edge between one or two rooms
///
/// `adjacent_room_ids` holds exactly one `None` for exterior walls and two
/// room ids for walls shared by two rooms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WallSegment {
    pub id: WallId,
    pub start: Point2D,
    pub end: Point2D,
    pub is_exterior: bool,
    pub adjacent_room_ids: [Option<RoomId>; 2],
    pub length: f64,
}

impl WallSegment {
    /// Wall shared by two rooms
    pub fn interior(id: WallId, start: Point2D, end: Point2D, rooms: (RoomId, RoomId)) -> Self {
        Self {
            id,
            start,
            end,
            is_exterior: false,
            adjacent_room_ids: [Some(rooms.0), Some(rooms.1)],
            length: start.distance_to(&end),
        }
    }

    /// Wall between a room and the outside
    pub fn exterior(id: WallId, start: Point2D, end: Point2D, room: RoomId) -> Self {
        Self {
            id,
            start,
            end,
            is_exterior: true,
            adjacent_room_ids: [Some(room), None],
            length: start.distance_to(&end),
        }
    }

    /// Point at `fraction` along the wall (0 = start, 1 = end)
    pub fn point_at(&self, fraction: f64) -> Point2D {
        self.start.lerp(&self.end, fraction)
    }

    /// Unit direction from start to end
    pub fn direction(&self) -> Vector2<f64> {
        let v = self.start.vector_to(&self.end);
        if self.length > 0.0 {
            v / self.length
        } else {
            v
        }
    }

    pub fn midpoint(&self) -> Point2D {
        self.point_at(0.5)
    }

    /// Whether `room` is on either side of this wall
    pub fn touches_room(&self, room: &str) -> bool {
        self.adjacent_room_ids
            .iter()
            .flatten()
            .any(|id| id == room)
    }
}

/// A chain of collinear, contiguous wall segments of the same kind
///
/// Used for selection: the user picks one logical wall, placement rules
/// still run against the sub-segment the opening lands on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalWall {
    pub id: WallId,
    pub start: Point2D,
    pub end: Point2D,
    pub is_exterior: bool,
    pub length: f64,
    /// Sub-segments ordered from `start` to `end`, with their span as
    /// `[from, to]` fractions of the logical wall
    pub segments: Vec<(WallId, f64, f64)>,
}

impl LogicalWall {
    /// Map a logical-wall fraction onto a sub-segment and its local fraction
    ///
    /// Fractions are measured from the logical wall's start; a segment whose
    /// direction runs opposite to the chain gets its local fraction flipped.
    pub fn locate(&self, fraction: f64, walls: &[WallSegment]) -> Option<(WallId, f64)> {
        if !(0.0..=1.0).contains(&fraction) {
            return None;
        }
        let (id, from, to) = self
            .segments
            .iter()
            .find(|(_, from, to)| fraction >= *from && fraction <= *to)?;
        let span = to - from;
        if span <= 0.0 {
            return None;
        }
        let local = (fraction - from) / span;
        let segment = walls.iter().find(|w| &w.id == id)?;
        // Segment runs against the chain when its start is farther from the chain start
        let reversed = segment.start.distance_to(&self.start) > segment.end.distance_to(&self.start);
        Some((id.clone(), if reversed { 1.0 - local } else { local }))
    }
}

/// Opening type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    Door,
    Window,
}

impl OpeningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpeningKind::Door => "door",
            OpeningKind::Window => "window",
        }
    }
}

/// Door swing side, as seen from the wall start looking toward the end
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SwingDirection {
    Left,
    Right,
}

/// A door or window the user wants to place
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningCandidate {
    pub kind: OpeningKind,
    pub wall_id: WallId,
    /// Center of the opening as a fraction of the wall length
    pub position_on_wall: f64,
    pub width_inches: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<SwingDirection>,
}

impl OpeningCandidate {
    pub fn door(wall_id: impl Into<WallId>, position_on_wall: f64, width_inches: f64) -> Self {
        Self {
            kind: OpeningKind::Door,
            wall_id: wall_id.into(),
            position_on_wall,
            width_inches,
            swing: None,
        }
    }

    pub fn window(wall_id: impl Into<WallId>, position_on_wall: f64, width_inches: f64) -> Self {
        Self {
            kind: OpeningKind::Window,
            wall_id: wall_id.into(),
            position_on_wall,
            width_inches,
            swing: None,
        }
    }

    pub fn with_swing(mut self, swing: SwingDirection) -> Self {
        self.swing = Some(swing);
        self
    }

    /// Accept the candidate as a placement with the given id
    pub fn into_placement(self, id: impl Into<String>) -> OpeningPlacement {
        OpeningPlacement {
            id: id.into(),
            kind: self.kind,
            wall_id: self.wall_id,
            position_on_wall: self.position_on_wall,
            width_inches: self.width_inches,
            swing: self.swing,
        }
    }
}

/// An opening accepted onto a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpeningPlacement {
    pub id: String,
    pub kind: OpeningKind,
    pub wall_id: WallId,
    pub position_on_wall: f64,
    pub width_inches: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swing: Option<SwingDirection>,
}

/// Configuration for wall extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Coordinates closer than this on both axes are the same vertex (drawing units)
    pub epsilon: f64,
    /// Maximum sine of the angle between segments merged into one logical wall
    pub collinear_tolerance: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.5,
            collinear_tolerance: 0.01, // ~0.6 degrees
        }
    }
}

/// Configuration for opening placement rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Real-world inches per drawing unit
    pub inches_per_unit: f64,
    /// Keep-out zone at each wall end, as a fraction of wall length
    pub min_clearance_fraction: f64,
    /// Minimum distance between two openings on the same wall
    pub min_gap_inches: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            inches_per_unit: 2.0, // generator draws 1 unit = 2 inches
            min_clearance_fraction: 0.02,
            min_gap_inches: 4.0,
        }
    }
}

/// Framing of the cropped drawing sent with render requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropConfig {
    /// Margin around the rooms before aspect fitting, in drawing units
    pub padding: f64,
    /// Output pixels per drawing unit
    pub scale_factor: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            padding: 24.0, // about 4 feet at 2 inches per unit
            scale_factor: 4.0,
        }
    }
}

impl PlacementConfig {
    /// Convert a real-world width in inches to drawing units
    pub fn inches_to_units(&self, inches: f64) -> f64 {
        inches / self.inches_per_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wall_length_matches_endpoints() {
        let wall = WallSegment::exterior(
            "w0".into(),
            Point2D::new(0.0, 0.0),
            Point2D::new(3.0, 4.0),
            "a".into(),
        );
        assert_relative_eq!(wall.length, 5.0);
        assert!(wall.is_exterior);
        assert!(wall.adjacent_room_ids[1].is_none());
    }

    #[test]
    fn test_point_at_and_direction() {
        let wall = WallSegment::interior(
            "w1".into(),
            Point2D::new(0.0, 10.0),
            Point2D::new(0.0, 0.0),
            ("a".into(), "b".into()),
        );
        let p = wall.point_at(0.25);
        assert_relative_eq!(p.y, 7.5);
        assert_relative_eq!(wall.direction().y, -1.0);
        assert!(wall.touches_room("b"));
        assert!(!wall.touches_room("c"));
    }

    #[test]
    fn test_room_area_and_bounds() {
        let room = RoomPolygon::new(
            "r",
            "bedroom",
            vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(4.0, 0.0),
                Point2D::new(4.0, 2.0),
                Point2D::new(0.0, 2.0),
            ],
        );
        assert_relative_eq!(room.area(), 8.0);
        let bounds = room.bounds().unwrap();
        assert_relative_eq!(bounds.width(), 4.0);
        assert_relative_eq!(bounds.height(), 2.0);
        let c = room.centroid().unwrap();
        assert_relative_eq!(c.x, 2.0);
        assert_relative_eq!(c.y, 1.0);
    }

    #[test]
    fn test_opening_kind_serializes_lowercase() {
        let json = serde_json::to_string(&OpeningKind::Window).unwrap();
        assert_eq!(json, "\"window\"");
    }
}
