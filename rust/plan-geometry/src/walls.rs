// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wall extraction from room polygons
//!
//! Every room edge is a wall. An edge matched by an edge of another room
//! (within epsilon, either direction) is an interior wall shared by both;
//! an unmatched edge is exterior. Room counts are small, so edges are
//! compared pairwise.

use crate::segment_ops::{
    are_collinear, collapse_vertices, edges_match, point_on_segment_interior,
    point_to_segment_distance, points_coincide, project_onto_segment,
};
use crate::types::{
    ExtractionConfig, LogicalWall, Point2D, RoomId, RoomPolygon, WallId, WallSegment,
};
use thiserror::Error;

/// Reason the walls of a drawing could not be derived
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionDiagnostic {
    #[error("drawing has no room polygons")]
    NoRooms,

    #[error("room '{room_id}' has {vertices} distinct vertices, need at least 3")]
    DegeneratePolygon { room_id: RoomId, vertices: usize },

    #[error("room '{room_id}' has zero area")]
    ZeroArea { room_id: RoomId },

    #[error("room '{room_id}' has a non-finite coordinate")]
    NonFiniteCoordinate { room_id: RoomId },
}

/// Walls plus the diagnostics explaining an empty result
#[derive(Debug, Clone, Default)]
pub struct WallExtraction {
    pub walls: Vec<WallSegment>,
    pub diagnostics: Vec<ExtractionDiagnostic>,
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    start: Point2D,
    end: Point2D,
}

/// Derive wall segments from room polygons
///
/// Total: malformed input yields an empty list and a logged diagnostic.
/// Callers should disable opening editing when the result is empty.
pub fn extract_walls(rooms: &[RoomPolygon], config: &ExtractionConfig) -> Vec<WallSegment> {
    let extraction = extract_walls_with_diagnostics(rooms, config);
    for diagnostic in &extraction.diagnostics {
        tracing::warn!(%diagnostic, "Wall extraction skipped");
    }
    extraction.walls
}

/// Derive wall segments, returning diagnostics instead of logging them
pub fn extract_walls_with_diagnostics(
    rooms: &[RoomPolygon],
    config: &ExtractionConfig,
) -> WallExtraction {
    let eps = config.epsilon;

    if rooms.is_empty() {
        return WallExtraction {
            walls: Vec::new(),
            diagnostics: vec![ExtractionDiagnostic::NoRooms],
        };
    }

    // Step 1: Clean polygons, rejecting the whole drawing on any bad room
    let mut diagnostics = Vec::new();
    let mut outlines: Vec<Vec<Point2D>> = Vec::with_capacity(rooms.len());
    for room in rooms {
        if !room.points.iter().all(Point2D::is_finite) {
            diagnostics.push(ExtractionDiagnostic::NonFiniteCoordinate {
                room_id: room.id.clone(),
            });
            continue;
        }
        let outline = collapse_vertices(&room.points, eps);
        if outline.len() < 3 {
            diagnostics.push(ExtractionDiagnostic::DegeneratePolygon {
                room_id: room.id.clone(),
                vertices: outline.len(),
            });
            continue;
        }
        if RoomPolygon::calculate_area(&outline) <= eps * eps {
            diagnostics.push(ExtractionDiagnostic::ZeroArea {
                room_id: room.id.clone(),
            });
            continue;
        }
        outlines.push(outline);
    }
    if !diagnostics.is_empty() {
        return WallExtraction {
            walls: Vec::new(),
            diagnostics,
        };
    }

    // Step 2: Edges, split wherever another room's vertex lands mid-edge
    let edges: Vec<Vec<Edge>> = outlines
        .iter()
        .enumerate()
        .map(|(i, outline)| split_edges(outline, i, &outlines, eps))
        .collect();

    // Step 3: Pairwise matching
    let mut matched: Vec<Vec<bool>> = edges.iter().map(|e| vec![false; e.len()]).collect();
    let mut walls = Vec::new();

    for pi in 0..edges.len() {
        for ei in 0..edges[pi].len() {
            if matched[pi][ei] {
                continue;
            }
            let edge = edges[pi][ei];
            let partner = (pi + 1..edges.len()).find_map(|pj| {
                edges[pj]
                    .iter()
                    .enumerate()
                    .find(|(ej, other)| {
                        !matched[pj][*ej]
                            && edges_match((&edge.start, &edge.end), (&other.start, &other.end), eps)
                    })
                    .map(|(ej, _)| (pj, ej))
            });

            let id = format!("wall-{}", walls.len());
            match partner {
                Some((pj, ej)) => {
                    matched[pi][ei] = true;
                    matched[pj][ej] = true;
                    walls.push(WallSegment::interior(
                        id,
                        edge.start,
                        edge.end,
                        (rooms[pi].id.clone(), rooms[pj].id.clone()),
                    ));
                }
                None => {
                    walls.push(WallSegment::exterior(
                        id,
                        edge.start,
                        edge.end,
                        rooms[pi].id.clone(),
                    ));
                }
            }
        }
    }

    tracing::debug!(
        rooms = rooms.len(),
        walls = walls.len(),
        interior = walls.iter().filter(|w| !w.is_exterior).count(),
        "Extracted walls"
    );

    WallExtraction {
        walls,
        diagnostics: Vec::new(),
    }
}

/// Edges of one outline, split at foreign vertices lying on their interior
fn split_edges(outline: &[Point2D], index: usize, all: &[Vec<Point2D>], eps: f64) -> Vec<Edge> {
    let n = outline.len();
    let mut edges = Vec::with_capacity(n);

    for i in 0..n {
        let start = outline[i];
        let end = outline[(i + 1) % n];
        if points_coincide(&start, &end, eps) {
            continue;
        }

        let mut cuts: Vec<f64> = all
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != index)
            .flat_map(|(_, other)| other.iter())
            .filter(|p| point_on_segment_interior(p, &start, &end, eps))
            .map(|p| project_onto_segment(p, &start, &end))
            .collect();
        cuts.sort_by(f64::total_cmp);

        let mut from = start;
        for t in cuts {
            // Snap the cut onto the edge so sub-edges stay collinear
            let cut = start.lerp(&end, t);
            if points_coincide(&from, &cut, eps) || points_coincide(&cut, &end, eps) {
                continue;
            }
            edges.push(Edge { start: from, end: cut });
            from = cut;
        }
        edges.push(Edge { start: from, end });
    }

    edges
}

/// Merge collinear, contiguous walls of the same kind into logical walls
///
/// Each logical wall keeps its ordered sub-segments so a selection can be
/// mapped back to the segment the placement rules run against.
pub fn merge_collinear(walls: &[WallSegment], config: &ExtractionConfig) -> Vec<LogicalWall> {
    let eps = config.epsilon;
    let mut used = vec![false; walls.len()];
    let mut logical = Vec::new();

    for (i, wall) in walls.iter().enumerate() {
        if used[i] {
            continue;
        }
        used[i] = true;

        // Chain entries: (wall index, chain-ordered start, chain-ordered end)
        let mut chain: Vec<(usize, Point2D, Point2D)> = vec![(i, wall.start, wall.end)];

        loop {
            let chain_start = chain[0].1;
            let chain_end = chain[chain.len() - 1].2;
            let mut extended = false;

            for (j, other) in walls.iter().enumerate() {
                if used[j] || other.is_exterior != wall.is_exterior {
                    continue;
                }
                if !are_collinear(
                    (&chain_start, &chain_end),
                    (&other.start, &other.end),
                    config.collinear_tolerance,
                    eps,
                ) {
                    continue;
                }

                let link = if points_coincide(&other.start, &chain_end, eps) {
                    Some((true, other.start, other.end))
                } else if points_coincide(&other.end, &chain_end, eps) {
                    Some((true, other.end, other.start))
                } else if points_coincide(&other.end, &chain_start, eps) {
                    Some((false, other.start, other.end))
                } else if points_coincide(&other.start, &chain_start, eps) {
                    Some((false, other.end, other.start))
                } else {
                    None
                };

                if let Some((at_end, from, to)) = link {
                    if at_end {
                        chain.push((j, from, to));
                    } else {
                        chain.insert(0, (j, from, to));
                    }
                    used[j] = true;
                    extended = true;
                    break;
                }
            }

            if !extended {
                break;
            }
        }

        logical.push(build_logical_wall(walls, &chain));
    }

    logical
}

fn build_logical_wall(walls: &[WallSegment], chain: &[(usize, Point2D, Point2D)]) -> LogicalWall {
    let total: f64 = chain.iter().map(|(i, _, _)| walls[*i].length).sum();
    let mut segments = Vec::with_capacity(chain.len());
    let mut acc = 0.0;
    for (i, _, _) in chain {
        let from = acc / total;
        acc += walls[*i].length;
        let to = if segments.len() + 1 == chain.len() {
            1.0
        } else {
            acc / total
        };
        segments.push((walls[*i].id.clone(), from, to));
    }

    let id = chain
        .iter()
        .map(|(i, _, _)| walls[*i].id.as_str())
        .collect::<Vec<_>>()
        .join("+");

    let first = &walls[chain[0].0];
    LogicalWall {
        id,
        start: chain[0].1,
        end: chain[chain.len() - 1].2,
        is_exterior: first.is_exterior,
        length: total,
        segments,
    }
}

/// Find the wall a drawing point lies on
///
/// Returns the closest wall within `epsilon` of `point` and the point's
/// fraction along that wall. Wall ids are reassigned on every extraction,
/// so placements are carried over to a new wall list through this.
pub fn locate_point_on_walls(
    point: &Point2D,
    walls: &[WallSegment],
    epsilon: f64,
) -> Option<(WallId, f64)> {
    walls
        .iter()
        .map(|wall| (wall, point_to_segment_distance(point, &wall.start, &wall.end)))
        .filter(|(_, distance)| *distance <= epsilon)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(wall, _)| {
            let t = project_onto_segment(point, &wall.start, &wall.end).clamp(0.0, 1.0);
            (wall.id.clone(), t)
        })
}
