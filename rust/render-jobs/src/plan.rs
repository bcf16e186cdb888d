// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan state owned by an editing session.

use crate::error::PlanError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use planedit_geometry::{raster_dimensions, OpeningPlacement, RasterSize};

/// Encoded raster preview with its pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    png: Vec<u8>,
    size: RasterSize,
}

impl Raster {
    /// Wrap encoded image bytes, reading the size from the header.
    pub fn from_png(png: Vec<u8>) -> Result<Self, PlanError> {
        let size = raster_dimensions(&png)?;
        Ok(Self { png, size })
    }

    /// Decode a base64 image as sent by the render service.
    pub fn from_base64(data: &str) -> Result<Self, PlanError> {
        // Some services send a data URL
        let payload = data
            .split_once(";base64,")
            .map(|(_, rest)| rest)
            .unwrap_or(data)
            .trim();
        Self::from_png(STANDARD.decode(payload)?)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn size(&self) -> RasterSize {
        self.size
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.png)
    }
}

/// A floor plan under edit.
#[derive(Debug, Clone)]
pub struct Plan {
    pub id: String,
    /// SVG drawing
    pub drawing: String,
    pub raster: Raster,
    pub openings: Vec<OpeningPlacement>,
}

impl Plan {
    pub fn new(id: impl Into<String>, drawing: impl Into<String>, raster: Raster) -> Self {
        Self {
            id: id.into(),
            drawing: drawing.into(),
            raster,
            openings: Vec::new(),
        }
    }

    pub fn opening(&self, id: &str) -> Option<&OpeningPlacement> {
        self.openings.iter().find(|o| o.id == id)
    }

    /// Remove an opening by id, returning it if present.
    pub fn remove_opening(&mut self, id: &str) -> Option<OpeningPlacement> {
        let index = self.openings.iter().position(|o| o.id == id)?;
        Some(self.openings.remove(index))
    }
}
