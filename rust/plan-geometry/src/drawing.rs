// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan drawing parser
//!
//! Turns a generated SVG floor plan into a labeled polygon list plus its
//! declared view box. Every filled `rect`, `polygon` and `path` is a room
//! candidate; rendered openings, definitions and unfilled strokes are not.

use crate::error::{DrawingError, Result};
use crate::palette::{normalize_color, RoomPalette};
use crate::types::{Bounds, CropConfig, Point2D, RasterSize, RoomPolygon, ViewBox};
use nalgebra::Matrix3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::str::FromStr;
use svgtypes::{Length, LengthUnit, PathParser, PathSegment, PointsParser};

/// Room type assigned when neither the palette nor the markup names one
pub const UNKNOWN_ROOM_TYPE: &str = "unknown";

/// Containers whose children are never drawn directly
const NON_RENDERED: &[&str] = &["defs", "clipPath", "mask", "pattern", "marker", "symbol"];

/// Fills used for canvas backgrounds and solid walls, never rooms unless
/// the element declares a `data-room-type`
const NON_ROOM_FILLS: &[&str] = &["ffffff", "000000"];

/// Parsed floor plan drawing
#[derive(Debug, Clone)]
pub struct ParsedDrawing {
    /// Declared coordinate window, `None` when it cannot be derived
    pub view_box: Option<ViewBox>,
    /// Root `width` attribute in user units
    pub width: Option<f64>,
    /// Root `height` attribute in user units
    pub height: Option<f64>,
    /// Room shapes in document order
    pub rooms: Vec<RoomPolygon>,
}

impl ParsedDrawing {
    /// Distinct room-type keys in document order, excluding `unknown`
    pub fn room_type_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for room in &self.rooms {
            if room.room_type != UNKNOWN_ROOM_TYPE && !keys.contains(&room.room_type) {
                keys.push(room.room_type.clone());
            }
        }
        keys
    }

    /// Bounding box of all room vertices
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.rooms
            .iter()
            .filter_map(|r| r.bounds())
            .reduce(|a, b| a.union(&b))
    }
}

/// Parse an SVG floor plan
///
/// # Arguments
///
/// * `svg` - Raw SVG document text
/// * `palette` - Fill color to room-type mapping
///
/// # Returns
///
/// The drawing's view box and room polygons. Malformed XML is an error;
/// shapes that cannot be read are skipped with a warning.
pub fn parse_drawing(svg: &str, palette: &RoomPalette) -> Result<ParsedDrawing> {
    let doc = Document::parse(svg)?;
    let root = doc.root_element();
    if root.tag_name().name() != "svg" {
        return Err(DrawingError::NotSvg(root.tag_name().name().to_string()));
    }

    let width = root.attribute("width").and_then(parse_user_length);
    let height = root.attribute("height").and_then(parse_user_length);
    let view_box = parse_view_box(root.attribute("viewBox"), width, height);

    let mut rooms = Vec::new();
    for node in root.descendants().filter(|n| n.is_element()) {
        let tag = node.tag_name().name();
        if !matches!(tag, "rect" | "polygon" | "path") || is_excluded(&node) {
            continue;
        }

        let Some(fill) = element_fill(&node) else {
            continue;
        };
        let Some(fill_hex) = normalize_color(&fill) else {
            continue;
        };

        let declared_type = node.attribute("data-room-type").map(str::to_string);
        if declared_type.is_none() && NON_ROOM_FILLS.contains(&fill_hex.as_str()) {
            continue;
        }
        let room_type = declared_type.or_else(|| palette.lookup(&fill_hex).map(str::to_string));

        let points = match shape_points(&node, tag) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable room shape");
                continue;
            }
        };
        if points.is_empty() {
            continue;
        }

        let transform = accumulated_transform(&node);
        let points = points.iter().map(|p| apply_transform(&transform, p)).collect();

        let id = node
            .attribute("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("room-{}", rooms.len()));

        rooms.push(RoomPolygon {
            id,
            room_type: room_type.unwrap_or_else(|| UNKNOWN_ROOM_TYPE.to_string()),
            fill: Some(fill_hex),
            points,
        });
    }

    tracing::debug!(
        rooms = rooms.len(),
        has_view_box = view_box.is_some(),
        "Parsed floor plan drawing"
    );

    Ok(ParsedDrawing {
        view_box,
        width,
        height,
        rooms,
    })
}

/// Read just the view box of a drawing
pub fn drawing_view_box(svg: &str) -> Option<ViewBox> {
    let doc = Document::parse(svg).ok()?;
    let root = doc.root_element();
    let width = root.attribute("width").and_then(parse_user_length);
    let height = root.attribute("height").and_then(parse_user_length);
    parse_view_box(root.attribute("viewBox"), width, height)
}

/// Standard output aspect ratios, width to height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "16:9")]
    Wide,
    #[serde(rename = "9:16")]
    Tall,
}

impl AspectRatio {
    /// Candidates in preference order; earlier entries win ties
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Wide,
        AspectRatio::Tall,
    ];

    pub fn ratio(&self) -> f64 {
        match self {
            AspectRatio::Square => 1.0,
            AspectRatio::Landscape => 4.0 / 3.0,
            AspectRatio::Portrait => 3.0 / 4.0,
            AspectRatio::Wide => 16.0 / 9.0,
            AspectRatio::Tall => 9.0 / 16.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Wide => "16:9",
            AspectRatio::Tall => "9:16",
        }
    }

    /// Ratio needing the least relative padding to frame `width` x `height`
    pub fn best_fit(width: f64, height: f64) -> AspectRatio {
        if width <= 0.0 || height <= 0.0 {
            return AspectRatio::Square;
        }
        let content = width / height;
        let mut best = AspectRatio::Square;
        let mut best_padding = f64::INFINITY;
        for candidate in AspectRatio::ALL {
            let target = candidate.ratio();
            let padding = if content > target {
                (width / target - height) / height
            } else {
                (height * target - width) / width
            };
            if padding < best_padding {
                best_padding = padding;
                best = candidate;
            }
        }
        best
    }
}

/// Framing of a cropped drawing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropFrame {
    /// Padded content, grown to `aspect_ratio` and centred
    pub view_box: ViewBox,
    pub aspect_ratio: AspectRatio,
    /// Root `width`/`height` of the cropped drawing
    pub output_size: RasterSize,
}

impl CropFrame {
    /// Frame `content` with padding, then fit it to the closest standard ratio
    pub fn fit(content: &Bounds, config: &CropConfig) -> Result<CropFrame> {
        let padded_width = content.width() + 2.0 * config.padding;
        let padded_height = content.height() + 2.0 * config.padding;
        if !(padded_width.is_finite() && padded_height.is_finite())
            || padded_width <= 0.0
            || padded_height <= 0.0
        {
            return Err(DrawingError::EmptyExtent);
        }

        let aspect_ratio = AspectRatio::best_fit(padded_width, padded_height);
        let target = aspect_ratio.ratio();
        let (width, height) = if padded_width / padded_height > target {
            (padded_width, padded_width / target)
        } else {
            (padded_height * target, padded_height)
        };

        let view_box = ViewBox::new(
            content.min_x - (width - content.width()) / 2.0,
            content.min_y - (height - content.height()) / 2.0,
            width,
            height,
        );
        let output_size = RasterSize::new(
            (width * config.scale_factor).round() as u32,
            (height * config.scale_factor).round() as u32,
        );
        Ok(CropFrame {
            view_box,
            aspect_ratio,
            output_size,
        })
    }
}

/// A drawing reframed around its rooms
#[derive(Debug, Clone, PartialEq)]
pub struct CroppedDrawing {
    pub svg: String,
    pub frame: CropFrame,
}

/// Produce a variant of the drawing framed tightly around the rooms
///
/// The room bounds are padded, fitted to the nearest standard aspect
/// ratio and centred. The root `viewBox`, `width` and `height` are
/// rewritten (or added); the rest of the document is left byte-for-byte
/// intact.
pub fn crop_drawing(svg: &str, palette: &RoomPalette, config: &CropConfig) -> Result<CroppedDrawing> {
    let parsed = parse_drawing(svg, palette)?;
    let bounds = parsed.content_bounds().ok_or(DrawingError::NoRooms)?;
    let frame = CropFrame::fit(&bounds, config)?;
    let vb = frame.view_box;

    let svg = rewrite_root_attributes(
        svg,
        &[
            ("viewBox", format!("{} {} {} {}", vb.x, vb.y, vb.width, vb.height)),
            ("width", frame.output_size.width.to_string()),
            ("height", frame.output_size.height.to_string()),
        ],
    )?;
    tracing::debug!(
        aspect_ratio = frame.aspect_ratio.as_str(),
        width = frame.output_size.width,
        height = frame.output_size.height,
        "Cropped drawing"
    );
    Ok(CroppedDrawing { svg, frame })
}

/// Set attributes on the root element, editing values in place
///
/// Attribute positions come from the parsed document, so spacing around
/// `=` and markup inside other attribute values do not matter. Missing
/// attributes are inserted after the element name.
fn rewrite_root_attributes(svg: &str, updates: &[(&str, String)]) -> Result<String> {
    let doc = Document::parse(svg)?;
    let root = doc.root_element();

    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut inserted = String::new();
    for (name, value) in updates {
        let existing = root
            .attributes()
            .find(|a| a.namespace().is_none() && a.name() == *name);
        match existing {
            Some(attr) => edits.push((attr.range_value(), value.clone())),
            None => inserted.push_str(&format!(" {}=\"{}\"", name, value)),
        }
    }
    if !inserted.is_empty() {
        let at = element_name_end(svg, root.range().start);
        edits.push((at..at, inserted));
    }

    // Apply back to front so earlier ranges stay valid
    edits.sort_by_key(|(range, _)| std::cmp::Reverse(range.start));
    let mut out = svg.to_string();
    for (range, text) in edits {
        out.replace_range(range, &text);
    }
    Ok(out)
}

/// Byte offset just past the element name of the start tag at `tag_start`
fn element_name_end(svg: &str, tag_start: usize) -> usize {
    svg[tag_start + 1..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .map(|i| tag_start + 1 + i)
        .unwrap_or(svg.len())
}

fn parse_view_box(attr: Option<&str>, width: Option<f64>, height: Option<f64>) -> Option<ViewBox> {
    let from_attr = attr
        .and_then(|s| svgtypes::ViewBox::from_str(s).ok())
        .map(|vb| ViewBox::new(vb.x, vb.y, vb.w, vb.h))
        .filter(ViewBox::is_usable);
    if from_attr.is_some() {
        return from_attr;
    }
    match (width, height) {
        (Some(w), Some(h)) => Some(ViewBox::new(0.0, 0.0, w, h)).filter(ViewBox::is_usable),
        _ => None,
    }
}

/// Parse a length in user units (`768`, `768px`); relative units are rejected
fn parse_user_length(value: &str) -> Option<f64> {
    let length = Length::from_str(value.trim()).ok()?;
    match length.unit {
        LengthUnit::None | LengthUnit::Px => Some(length.number),
        _ => None,
    }
}

fn is_excluded(node: &Node) -> bool {
    node.ancestors().any(|a| {
        if !a.is_element() {
            return false;
        }
        if NON_RENDERED.contains(&a.tag_name().name()) || a.attribute("id") == Some("openings") {
            return true;
        }
        a.attribute("class")
            .map(|c| c.split_whitespace().any(|cls| cls.starts_with("opening")))
            .unwrap_or(false)
    })
}

/// Fill from the `fill` attribute, falling back to `fill:` in `style`
fn element_fill(node: &Node) -> Option<String> {
    let attr = node
        .attribute("fill")
        .map(str::trim)
        .filter(|f| !f.is_empty() && *f != "none");
    if let Some(fill) = attr {
        return Some(fill.to_string());
    }

    let style = node.attribute("style")?;
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .find(|(name, _)| name.trim() == "fill")
        .map(|(_, value)| value.trim().to_string())
        .filter(|f| !f.is_empty() && f != "none")
}

fn shape_points(node: &Node, tag: &str) -> Result<Vec<Point2D>> {
    match tag {
        "rect" => {
            let x = number_attr(node, "x")?.unwrap_or(0.0);
            let y = number_attr(node, "y")?.unwrap_or(0.0);
            let w = number_attr(node, "width")?.unwrap_or(0.0);
            let h = number_attr(node, "height")?.unwrap_or(0.0);
            if w <= 0.0 || h <= 0.0 {
                return Ok(Vec::new());
            }
            Ok(vec![
                Point2D::new(x, y),
                Point2D::new(x + w, y),
                Point2D::new(x + w, y + h),
                Point2D::new(x, y + h),
            ])
        }
        "polygon" => Ok(node
            .attribute("points")
            .map(|s| PointsParser::from(s).map(|(x, y)| Point2D::new(x, y)).collect())
            .unwrap_or_default()),
        "path" => path_points(node),
        _ => Ok(Vec::new()),
    }
}

fn number_attr(node: &Node, attribute: &'static str) -> Result<Option<f64>> {
    match node.attribute(attribute) {
        None => Ok(None),
        Some(value) => parse_user_length(value)
            .map(Some)
            .ok_or_else(|| DrawingError::InvalidAttribute {
                element: node.tag_name().name().to_string(),
                attribute,
                message: format!("'{}' is not a length in user units", value),
            }),
    }
}

/// Vertices of the first subpath of a `path` element
///
/// Straight commands are followed exactly; curves and arcs contribute their
/// end point, which is all a room outline ever needs.
fn path_points(node: &Node) -> Result<Vec<Point2D>> {
    let Some(d) = node.attribute("d") else {
        return Ok(Vec::new());
    };

    let mut points: Vec<Point2D> = Vec::new();
    let mut current = Point2D::new(0.0, 0.0);

    for segment in PathParser::from(d) {
        let segment = segment.map_err(|e| DrawingError::InvalidAttribute {
            element: "path".to_string(),
            attribute: "d",
            message: e.to_string(),
        })?;

        let (abs, x, y) = match segment {
            PathSegment::MoveTo { abs, x, y } => {
                if !points.is_empty() {
                    break;
                }
                (abs, x, y)
            }
            PathSegment::LineTo { abs, x, y }
            | PathSegment::CurveTo { abs, x, y, .. }
            | PathSegment::SmoothCurveTo { abs, x, y, .. }
            | PathSegment::Quadratic { abs, x, y, .. }
            | PathSegment::SmoothQuadratic { abs, x, y }
            | PathSegment::EllipticalArc { abs, x, y, .. } => (abs, x, y),
            PathSegment::HorizontalLineTo { abs, x } => {
                if abs {
                    (true, x, current.y)
                } else {
                    (false, x, 0.0)
                }
            }
            PathSegment::VerticalLineTo { abs, y } => {
                if abs {
                    (true, current.x, y)
                } else {
                    (false, 0.0, y)
                }
            }
            PathSegment::ClosePath { .. } => break,
        };

        current = if abs {
            Point2D::new(x, y)
        } else {
            Point2D::new(current.x + x, current.y + y)
        };
        points.push(current);
    }

    Ok(points)
}

/// Product of every `transform` from the root down to `node`
fn accumulated_transform(node: &Node) -> Matrix3<f64> {
    let mut chain: Vec<Matrix3<f64>> = node
        .ancestors()
        .filter(|a| a.is_element())
        .filter_map(|a| a.attribute("transform"))
        .filter_map(|t| svgtypes::Transform::from_str(t).ok())
        .map(|t| Matrix3::new(t.a, t.c, t.e, t.b, t.d, t.f, 0.0, 0.0, 1.0))
        .collect();
    // ancestors() walks upward; outermost transform applies last
    chain.reverse();
    chain
        .into_iter()
        .fold(Matrix3::identity(), |acc, m| acc * m)
}

fn apply_transform(m: &Matrix3<f64>, p: &Point2D) -> Point2D {
    Point2D::new(
        m[(0, 0)] * p.x + m[(0, 1)] * p.y + m[(0, 2)],
        m[(1, 0)] * p.x + m[(1, 1)] * p.y + m[(1, 2)],
    )
}
