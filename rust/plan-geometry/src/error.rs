// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for drawing operations
pub type Result<T> = std::result::Result<T, DrawingError>;

/// Errors that can occur while reading a floor plan drawing or its raster preview
#[derive(Error, Debug)]
pub enum DrawingError {
    #[error("Malformed SVG: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Root element is <{0}>, expected <svg>")]
    NotSvg(String),

    #[error("Invalid {attribute} on <{element}>: {message}")]
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        message: String,
    },

    #[error("Drawing has no room shapes")]
    NoRooms,

    #[error("Drawing content has no extent to crop")]
    EmptyExtent,

    #[error("Raster image could not be decoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid rooms schema: {0}")]
    Schema(#[from] serde_json::Error),
}
