// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! View box ↔ raster coordinate mapping
//!
//! The raster preview is the drawing's view box stretched onto the image,
//! independently on each axis. Everything here is a pure function of the
//! mapper; rebuild it whenever the drawing or the raster changes.

use crate::drawing::drawing_view_box;
use crate::error::Result;
use crate::segment_ops::{point_to_segment_distance, project_onto_segment};
use crate::types::{Point2D, RasterSize, ViewBox, WallId, WallSegment};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Wall endpoints in raster space
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RasterSegment {
    pub start: Point2D,
    pub end: Point2D,
}

/// Where and how to draw an oriented door/window icon on the preview
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OpeningMarker {
    /// Opening center in raster pixels
    pub center: Point2D,
    /// Wall direction in raster space, degrees clockwise from +x (y points down)
    pub angle_degrees: f64,
    /// Opening width along the wall in raster pixels
    pub length_px: f64,
}

/// Axis-aligned pixel rectangle, clamped to the image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Result of hit-testing a click on the preview
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WallHit {
    pub wall_id: WallId,
    pub position_on_wall: f64,
    pub distance_px: f64,
}

/// Bidirectional mapping between drawing units and raster pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    view_box: ViewBox,
    raster_size: RasterSize,
    scale_x: f64,
    scale_y: f64,
}

impl CoordinateMapper {
    /// Build a mapper, `None` when either side is unusable
    ///
    /// Callers treat `None` as "opening editing unavailable".
    pub fn new(view_box: ViewBox, raster_size: RasterSize) -> Option<Self> {
        if !view_box.is_usable() || raster_size.width == 0 || raster_size.height == 0 {
            return None;
        }
        Some(Self {
            view_box,
            raster_size,
            scale_x: raster_size.width as f64 / view_box.width,
            scale_y: raster_size.height as f64 / view_box.height,
        })
    }

    /// Build a mapper from the drawing header and the encoded raster preview
    pub fn from_drawing(svg: &str, raster: &[u8]) -> Option<Self> {
        let view_box = drawing_view_box(svg)?;
        let size = match raster_dimensions(raster) {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, "Raster preview dimensions unavailable");
                return None;
            }
        };
        Self::new(view_box, size)
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    pub fn raster_size(&self) -> RasterSize {
        self.raster_size
    }

    pub fn scale_x(&self) -> f64 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f64 {
        self.scale_y
    }

    pub fn vector_to_raster(&self, p: &Point2D) -> Point2D {
        Point2D::new(
            (p.x - self.view_box.x) * self.scale_x,
            (p.y - self.view_box.y) * self.scale_y,
        )
    }

    pub fn raster_to_vector(&self, p: &Point2D) -> Point2D {
        Point2D::new(
            p.x / self.scale_x + self.view_box.x,
            p.y / self.scale_y + self.view_box.y,
        )
    }

    /// Wall endpoints for overlay rendering
    pub fn wall_to_raster(&self, wall: &WallSegment) -> RasterSegment {
        RasterSegment {
            start: self.vector_to_raster(&wall.start),
            end: self.vector_to_raster(&wall.end),
        }
    }

    /// Room outline in raster space, for blend masks
    pub fn polygon_to_raster(&self, points: &[Point2D]) -> Vec<Point2D> {
        points.iter().map(|p| self.vector_to_raster(p)).collect()
    }

    /// Raster center, rotation and length of an opening icon
    ///
    /// # Arguments
    ///
    /// * `wall` - Host wall
    /// * `position` - Opening center as a fraction of the wall
    /// * `width_units` - Opening width in drawing units
    pub fn opening_marker(&self, wall: &WallSegment, position: f64, width_units: f64) -> OpeningMarker {
        let raster = self.wall_to_raster(wall);
        let dx = raster.end.x - raster.start.x;
        let dy = raster.end.y - raster.start.y;

        // Non-uniform scale stretches widths differently along each axis
        let dir = wall.direction();
        let px_per_unit = ((dir.x * self.scale_x).powi(2) + (dir.y * self.scale_y).powi(2)).sqrt();

        OpeningMarker {
            center: self.vector_to_raster(&wall.point_at(position)),
            angle_degrees: dy.atan2(dx).to_degrees(),
            length_px: width_units * px_per_unit,
        }
    }

    /// Pixel region affected by an opening edit
    ///
    /// The region runs along the wall's dominant axis for the opening width
    /// plus `padding_px` on each end, and is `4 * padding_px` thick across
    /// the wall. Neither side is smaller than `3 * padding_px`. Returns
    /// `None` when the region falls entirely outside the image.
    pub fn opening_region(
        &self,
        wall: &WallSegment,
        position: f64,
        width_units: f64,
        padding_px: u32,
    ) -> Option<PixelRect> {
        let center = self.vector_to_raster(&wall.point_at(position));
        let pad = padding_px as f64;
        let horizontal = (wall.end.x - wall.start.x).abs() > (wall.end.y - wall.start.y).abs();

        let (w, h) = if horizontal {
            (width_units * self.scale_x + pad * 2.0, pad * 4.0)
        } else {
            (pad * 4.0, width_units * self.scale_y + pad * 2.0)
        };
        let w = w.max(pad * 3.0);
        let h = h.max(pad * 3.0);

        let max_x = self.raster_size.width as f64;
        let max_y = self.raster_size.height as f64;
        let x0 = (center.x - w / 2.0).clamp(0.0, max_x);
        let y0 = (center.y - h / 2.0).clamp(0.0, max_y);
        let x1 = (center.x + w / 2.0).clamp(0.0, max_x);
        let y1 = (center.y + h / 2.0).clamp(0.0, max_y);

        let rect = PixelRect {
            x: x0.floor() as u32,
            y: y0.floor() as u32,
            width: (x1.ceil() - x0.floor()) as u32,
            height: (y1.ceil() - y0.floor()) as u32,
        };
        (rect.width > 0 && rect.height > 0).then_some(rect)
    }

    /// Find the wall closest to a raster point
    ///
    /// Distances are measured in raster pixels; walls farther than
    /// `max_distance_px` are ignored. The returned position is the
    /// projection of the point onto the wall, clamped to `[0, 1]`.
    pub fn nearest_wall(
        &self,
        raster_point: &Point2D,
        walls: &[WallSegment],
        max_distance_px: f64,
    ) -> Option<WallHit> {
        walls
            .iter()
            .map(|wall| {
                let seg = self.wall_to_raster(wall);
                let distance = point_to_segment_distance(raster_point, &seg.start, &seg.end);
                let t = project_onto_segment(raster_point, &seg.start, &seg.end).clamp(0.0, 1.0);
                (wall, t, distance)
            })
            .filter(|(_, _, d)| *d <= max_distance_px)
            .min_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(wall, t, distance)| WallHit {
                wall_id: wall.id.clone(),
                position_on_wall: t,
                distance_px: distance,
            })
    }
}

/// Pixel dimensions of an encoded raster image, read from its header
pub fn raster_dimensions(bytes: &[u8]) -> Result<RasterSize> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?
        .into_dimensions()?;
    Ok(RasterSize::new(width, height))
}
