// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Localized raster blending
//!
//! A re-render can drift in areas unrelated to the edit. Blending pastes
//! only the rooms on either side of the new opening from the new render
//! onto the previous preview, with a soft edge. When no room outline is
//! available a padded rectangle around the opening is used instead.
//!
//! Windows change a room's lighting, so window renders are histogram
//! matched to the previous preview before blending.

use crate::error::Result;
use crate::mapper::PixelRect;
use crate::types::{OpeningKind, Point2D};
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Mask shaping for one kind of opening
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BlendProfile {
    /// Growth of room outlines in raster pixels
    pub expand_px: u32,
    /// Gaussian sigma of the mask edge in raster pixels; 0 gives a hard edge
    pub feather_radius: f32,
    /// Match the render's color histogram to the previous preview first
    pub match_histogram: bool,
}

/// Configuration for blending a render onto the previous preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlendConfig {
    /// Padding around the opening for the rectangular fallback, in raster pixels
    pub padding_px: u32,
    /// Edge softness of the rectangular fallback
    pub feather_radius: f32,
    pub door: BlendProfile,
    pub window: BlendProfile,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            padding_px: 50,
            feather_radius: 20.0,
            door: BlendProfile {
                expand_px: 5,
                feather_radius: 10.0,
                match_histogram: false,
            },
            window: BlendProfile {
                expand_px: 15,
                feather_radius: 20.0,
                match_histogram: true,
            },
        }
    }
}

impl BlendConfig {
    pub fn profile(&self, kind: OpeningKind) -> BlendProfile {
        match kind {
            OpeningKind::Door => self.door,
            OpeningKind::Window => self.window,
        }
    }

    /// Profile for the rectangular fallback: no growth, fallback feather
    pub fn fallback_profile(&self, kind: OpeningKind) -> BlendProfile {
        BlendProfile {
            expand_px: 0,
            feather_radius: self.feather_radius,
            ..self.profile(kind)
        }
    }
}

/// Area of the new render to keep
#[derive(Debug, Clone, PartialEq)]
pub enum BlendRegion {
    /// Room outlines in raster pixels
    Rooms(Vec<Vec<Point2D>>),
    /// Pixel rectangle around the opening
    Rect(PixelRect),
}

/// Soft-edged mask: 255 inside `region`, fading to 0 outside
///
/// Room outlines are filled, grown by `expand_px` and then blurred.
pub fn region_mask(
    width: u32,
    height: u32,
    region: &BlendRegion,
    expand_px: u32,
    feather_radius: f32,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    match region {
        BlendRegion::Rect(rect) => {
            if rect.width == 0 || rect.height == 0 {
                return mask;
            }
            draw_filled_rect_mut(
                &mut mask,
                Rect::at(rect.x as i32, rect.y as i32).of_size(rect.width, rect.height),
                Luma([255u8]),
            );
        }
        BlendRegion::Rooms(outlines) => {
            for outline in outlines {
                let Some(poly) = polygon_pixels(outline) else {
                    continue;
                };
                draw_polygon_mut(&mut mask, &poly, Luma([255u8]));
            }
            if expand_px > 0 {
                mask = imageproc::morphology::dilate(&mask, Norm::LInf, expand_px.min(255) as u8);
            }
        }
    }
    if feather_radius > 0.0 {
        mask = imageproc::filter::gaussian_blur_f32(&mask, feather_radius);
    }
    mask
}

/// Integer outline without a repeated closing vertex, `None` below 3 vertices
fn polygon_pixels(outline: &[Point2D]) -> Option<Vec<Point<i32>>> {
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(outline.len());
    for p in outline {
        if !p.is_finite() {
            return None;
        }
        let px = Point::new(p.x.floor() as i32, p.y.floor() as i32);
        if poly.last() != Some(&px) {
            poly.push(px);
        }
    }
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    (poly.len() >= 3).then_some(poly)
}

/// Remap each RGB channel of `source` so its histogram follows `reference`
///
/// Alpha is left untouched.
pub fn histogram_match(source: &RgbaImage, reference: &RgbaImage) -> RgbaImage {
    let lookups: [[u8; 256]; 3] =
        std::array::from_fn(|channel| channel_lookup(source, reference, channel));
    let mut out = source.clone();
    for pixel in out.pixels_mut() {
        for (channel, lookup) in lookups.iter().enumerate() {
            pixel.0[channel] = lookup[pixel.0[channel] as usize];
        }
    }
    out
}

fn cumulative(image: &RgbaImage, channel: usize) -> [f64; 256] {
    let mut hist = [0u64; 256];
    for pixel in image.pixels() {
        hist[pixel.0[channel] as usize] += 1;
    }
    let total = hist.iter().sum::<u64>().max(1) as f64;
    let mut cdf = [0.0; 256];
    let mut running = 0u64;
    for (value, count) in hist.iter().enumerate() {
        running += count;
        cdf[value] = running as f64 / total;
    }
    cdf
}

fn channel_lookup(source: &RgbaImage, reference: &RgbaImage, channel: usize) -> [u8; 256] {
    let src_cdf = cumulative(source, channel);
    let ref_cdf = cumulative(reference, channel);
    let mut lookup = [0u8; 256];
    let mut ref_idx = 0usize;
    for (src_idx, target) in src_cdf.iter().enumerate() {
        while ref_idx < 255 && ref_cdf[ref_idx] < *target {
            ref_idx += 1;
        }
        lookup[src_idx] = ref_idx as u8;
    }
    lookup
}

/// Composite `rendered` over `previous` through `mask`
///
/// All three images must have the same dimensions.
pub fn composite(previous: &RgbaImage, rendered: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    let mut out = previous.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let alpha = mask.get_pixel(x, y).0[0] as f32 / 255.0;
        if alpha == 0.0 {
            continue;
        }
        let new = rendered.get_pixel(x, y);
        *pixel = Rgba(std::array::from_fn(|i| {
            (pixel.0[i] as f32 * (1.0 - alpha) + new.0[i] as f32 * alpha).round() as u8
        }));
    }
    out
}

/// Blend the `region` of `rendered` onto `previous`
///
/// `rendered` is resized to `previous` when their sizes differ.
pub fn blend_images(
    previous: &RgbaImage,
    rendered: &RgbaImage,
    region: &BlendRegion,
    profile: &BlendProfile,
) -> RgbaImage {
    let (width, height) = previous.dimensions();
    let mut rendered = if rendered.dimensions() != (width, height) {
        tracing::debug!(
            from = ?rendered.dimensions(),
            to = ?(width, height),
            "Resizing rendered image before blending"
        );
        imageops::resize(rendered, width, height, FilterType::Lanczos3)
    } else {
        rendered.clone()
    };
    if profile.match_histogram {
        rendered = histogram_match(&rendered, previous);
    }

    let mask = region_mask(width, height, region, profile.expand_px, profile.feather_radius);
    composite(previous, &rendered, &mask)
}

/// Decode two encoded previews, blend them and re-encode as PNG
pub fn blend_png(
    previous: &[u8],
    rendered: &[u8],
    region: &BlendRegion,
    profile: &BlendProfile,
) -> Result<Vec<u8>> {
    let previous = image::load_from_memory(previous)?.to_rgba8();
    let rendered = image::load_from_memory(rendered)?.to_rgba8();
    let blended = blend_images(&previous, &rendered, region, profile);

    let mut bytes = Vec::new();
    blended.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
