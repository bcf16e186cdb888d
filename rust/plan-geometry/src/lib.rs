// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan geometry for opening editing
//!
//! This crate provides the pure, synchronous half of opening editing:
//! 1. Parsing generated SVG floor plans into labeled room polygons
//! 2. Deriving interior and exterior wall segments from shared room edges
//! 3. Mapping between drawing units and raster preview pixels
//! 4. Checking door and window placements against wall rules
//! 5. Blending a re-rendered preview back onto the previous one
//!
//! # Usage
//!
//! ```rust,ignore
//! use planedit_geometry::{
//!     derive_walls, validate, CoordinateMapper, OpeningCandidate, PlacementConfig, RoomPalette,
//! };
//!
//! let walls = derive_walls(&svg, &RoomPalette::default(), &Default::default())?;
//! let mapper = CoordinateMapper::from_drawing(&svg, &png_bytes).expect("editable preview");
//!
//! // User clicked near a wall on the preview
//! let hit = mapper.nearest_wall(&click, &walls, 12.0).expect("a wall");
//! let wall = walls.iter().find(|w| w.id == hit.wall_id).unwrap();
//! let door = OpeningCandidate::door(hit.wall_id.clone(), hit.position_on_wall, 36.0);
//! validate(&door, wall, &existing, &PlacementConfig::default())?;
//! ```

pub mod blend;
pub mod drawing;
pub mod error;
pub mod mapper;
pub mod palette;
pub mod segment_ops;
pub mod types;
pub mod validator;
pub mod walls;

// Re-export commonly used types and functions
pub use blend::{
    blend_images, blend_png, histogram_match, region_mask, BlendConfig, BlendProfile, BlendRegion,
};
pub use drawing::{
    crop_drawing, drawing_view_box, parse_drawing, AspectRatio, CropFrame, CroppedDrawing,
    ParsedDrawing, UNKNOWN_ROOM_TYPE,
};
pub use error::{DrawingError, Result};
pub use mapper::{raster_dimensions, CoordinateMapper, OpeningMarker, PixelRect, RasterSegment, WallHit};
pub use palette::RoomPalette;
pub use types::{
    Bounds, CropConfig, ExtractionConfig, LogicalWall, OpeningCandidate, OpeningKind, OpeningPlacement,
    PlacementConfig, Point2D, RasterSize, RoomId, RoomPolygon, SwingDirection, ViewBox, WallId,
    WallSegment,
};
pub use validator::{validate, PlacementRejection};
pub use walls::{
    extract_walls, extract_walls_with_diagnostics, locate_point_on_walls, merge_collinear,
    ExtractionDiagnostic, WallExtraction,
};

/// Parse a drawing and derive its wall segments in one step
///
/// Parse failures are returned as errors; a drawing that parses but has
/// unusable rooms yields an empty wall list.
pub fn derive_walls(
    svg: &str,
    palette: &RoomPalette,
    config: &ExtractionConfig,
) -> Result<Vec<WallSegment>> {
    let drawing = parse_drawing(svg, palette)?;
    tracing::debug!(rooms = drawing.rooms.len(), "Parsed floor plan drawing");
    Ok(extract_walls(&drawing.rooms, config))
}
