// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Opening placement rules
//!
//! Checked locally before any render request is sent. All positions are
//! fractions of the host wall; widths are converted through
//! [`PlacementConfig::inches_per_unit`].

use crate::types::{OpeningCandidate, OpeningKind, OpeningPlacement, PlacementConfig, WallSegment};
use thiserror::Error;

/// Why a placement was refused
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlacementRejection {
    #[error("Opening targets wall {candidate} but was checked against wall {wall}")]
    WallMismatch { candidate: String, wall: String },

    #[error("Position {0} is outside the wall")]
    PositionOutOfRange(f64),

    #[error("Opening width must be a positive number of inches, got {0}")]
    InvalidWidth(f64),

    #[error("Opening is too close to a corner or does not fit on the wall")]
    TooCloseToCorner,

    #[error("Opening overlaps existing opening {other_id}")]
    Overlaps { other_id: String },

    #[error("Windows can only be placed on exterior walls")]
    WindowOnInteriorWall,
}

/// Check a candidate opening against its wall and the openings already on the plan
///
/// # Arguments
///
/// * `candidate` - Proposed opening
/// * `wall` - The wall named by `candidate.wall_id`
/// * `existing` - Every opening on the plan; only those on `wall` are considered
/// * `config` - Drawing scale and spacing rules
pub fn validate(
    candidate: &OpeningCandidate,
    wall: &WallSegment,
    existing: &[OpeningPlacement],
    config: &PlacementConfig,
) -> Result<(), PlacementRejection> {
    if candidate.wall_id != wall.id {
        return Err(PlacementRejection::WallMismatch {
            candidate: candidate.wall_id.clone(),
            wall: wall.id.clone(),
        });
    }
    let pos = candidate.position_on_wall;
    if !(0.0..=1.0).contains(&pos) {
        return Err(PlacementRejection::PositionOutOfRange(pos));
    }
    let width = candidate.width_inches;
    if !width.is_finite() || width <= 0.0 {
        return Err(PlacementRejection::InvalidWidth(width));
    }

    let wall_inches = wall.length * config.inches_per_unit;
    if wall_inches.is_nan() || wall_inches <= 0.0 {
        return Err(PlacementRejection::TooCloseToCorner);
    }

    let (lo, hi) = interval(pos, width, wall_inches);
    let margin = config.min_clearance_fraction;
    if lo < margin || hi > 1.0 - margin {
        return Err(PlacementRejection::TooCloseToCorner);
    }

    let gap = config.min_gap_inches / wall_inches;
    for other in existing.iter().filter(|o| o.wall_id == wall.id) {
        let (other_lo, other_hi) = interval(other.position_on_wall, other.width_inches, wall_inches);
        if lo < other_hi + gap && other_lo < hi + gap {
            return Err(PlacementRejection::Overlaps {
                other_id: other.id.clone(),
            });
        }
    }

    if candidate.kind == OpeningKind::Window && !wall.is_exterior {
        return Err(PlacementRejection::WindowOnInteriorWall);
    }

    Ok(())
}

/// Fractional extent of an opening centered at `pos`
fn interval(pos: f64, width_inches: f64, wall_inches: f64) -> (f64, f64) {
    let half = width_inches / 2.0 / wall_inches;
    (pos - half, pos + half)
}
