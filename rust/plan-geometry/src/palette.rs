// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fill color to room-type mapping
//!
//! Generated drawings identify room types only through their fill color.
//! The palette resolves a fill to a canonical room-type key, falling back to
//! the nearest known color within a fixed RGB distance.

use crate::error::Result;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::str::FromStr;

/// Largest RGB distance accepted by the nearest-color fallback
const MAX_COLOR_DISTANCE: f64 = 100.0;

/// Standard generator colors
const DEFAULT_COLORS: &[(&str, &str)] = &[
    // Primary suite
    ("f4a460", "primary_bedroom"),
    ("ffd700", "primary_bathroom"),
    ("daa520", "primary_closet"),
    // Bedrooms & baths
    ("ff8c00", "bedroom"),
    ("ff69b4", "bathroom"),
    ("e6e6fa", "bedroom"),
    // Living spaces
    ("87ceeb", "living"),
    ("a8d5e5", "living"),
    ("add8e6", "family_room"),
    ("b0e0e6", "den"),
    // Kitchen & dining
    ("98fb98", "kitchen"),
    ("90ee90", "kitchen"),
    ("ff7f50", "kitchen"),
    ("dda0dd", "dining"),
    ("ee82ee", "nook"),
    // Utility
    ("d3d3d3", "laundry"),
    ("c0c0c0", "garage"),
    ("a9a9a9", "storage"),
    ("bc8f8f", "mudroom"),
    // Flex spaces
    ("f0e68c", "office"),
    ("fafad2", "rec_room"),
    ("ffe4c4", "theater"),
    ("ffdead", "gym"),
    ("ffe4b5", "foyer"),
    // Outdoor
    ("7cfc00", "outdoor_living"),
    ("9acd32", "front_porch"),
    ("00ced1", "pool"),
    ("40e0d0", "sunroom"),
    // Pantry & bar
    ("deb887", "pantry"),
    ("f5deb3", "bar"),
];

/// Maps normalized fill colors to room-type keys
#[derive(Debug, Clone)]
pub struct RoomPalette {
    by_hex: FxHashMap<String, String>,
    entries: Vec<([u8; 3], String)>,
}

#[derive(Deserialize)]
struct RoomsSchema {
    #[serde(default)]
    types: FxHashMap<String, RoomTypeDef>,
}

#[derive(Deserialize)]
struct RoomTypeDef {
    #[serde(default)]
    colors: Option<RoomTypeColors>,
}

#[derive(Deserialize)]
struct RoomTypeColors {
    training_hex: Option<String>,
}

impl RoomPalette {
    /// Empty palette; every fill resolves to `None`
    pub fn empty() -> Self {
        Self {
            by_hex: FxHashMap::default(),
            entries: Vec::new(),
        }
    }

    /// Build a palette from a rooms schema document
    ///
    /// Reads `types.<key>.colors.training_hex` for every room type; types
    /// without a training color are skipped.
    pub fn from_rooms_schema(json: &str) -> Result<Self> {
        let schema: RoomsSchema = serde_json::from_str(json)?;
        let mut palette = Self::empty();
        let mut keys: Vec<_> = schema.types.into_iter().collect();
        // Deterministic order for the nearest-color fallback
        keys.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, def) in keys {
            if let Some(hex) = def.colors.and_then(|c| c.training_hex) {
                palette.insert(&hex, &key);
            }
        }
        Ok(palette)
    }

    /// Register a color; later registrations of the same color win
    pub fn insert(&mut self, color: &str, room_type: &str) {
        let Some(rgb) = parse_rgb(color) else {
            tracing::warn!(color, room_type, "Ignoring unparseable palette color");
            return;
        };
        let hex = to_hex(rgb);
        self.entries.retain(|(c, _)| *c != rgb);
        self.entries.push((rgb, room_type.to_string()));
        self.by_hex.insert(hex, room_type.to_string());
    }

    pub fn len(&self) -> usize {
        self.by_hex.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hex.is_empty()
    }

    /// Resolve a fill to a room-type key
    ///
    /// Exact matches win; otherwise the closest palette color within
    /// `MAX_COLOR_DISTANCE` is used.
    pub fn lookup(&self, fill: &str) -> Option<&str> {
        let rgb = parse_rgb(fill)?;
        if let Some(room_type) = self.by_hex.get(&to_hex(rgb)) {
            return Some(room_type.as_str());
        }

        let mut best: Option<(&str, f64)> = None;
        for (color, room_type) in &self.entries {
            let dist = color_distance(rgb, *color);
            if dist < MAX_COLOR_DISTANCE && best.map_or(true, |(_, d)| dist < d) {
                best = Some((room_type.as_str(), dist));
            }
        }
        best.map(|(room_type, _)| room_type)
    }
}

impl Default for RoomPalette {
    fn default() -> Self {
        let mut palette = Self::empty();
        for (hex, key) in DEFAULT_COLORS {
            palette.insert(hex, key);
        }
        palette
    }
}

/// Normalize a fill value to lowercase hex without `#`
///
/// Accepts anything SVG accepts as a color (`#abc`, `#aabbcc`, named
/// colors, `rgb(...)`). Returns `None` for `none`, gradients and garbage.
pub fn normalize_color(fill: &str) -> Option<String> {
    parse_rgb(fill).map(to_hex)
}

fn parse_rgb(fill: &str) -> Option<[u8; 3]> {
    let trimmed = fill.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return None;
    }
    // Bare hex without '#' shows up in schemas
    let candidate = if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", trimmed)
    } else {
        trimmed.to_string()
    };
    let color = svgtypes::Color::from_str(&candidate).ok()?;
    Some([color.red, color.green, color.blue])
}

fn to_hex(rgb: [u8; 3]) -> String {
    format!("{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    let dr = a[0] as f64 - b[0] as f64;
    let dg = a[1] as f64 - b[1] as f64;
    let db = a[2] as f64 - b[2] as f64;
    (dr * dr + dg * dg + db * db).sqrt()
}
