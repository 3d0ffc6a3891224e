use crate::data::{Connections, PieceId};
use crate::grid::Grid;
use glam::Vec3;
use tracing::debug;

/// Orientations tried before a piece gives up on finding a fit.
pub const ORIENTATIONS: usize = 4;

/// True when every coordinate of `a` and `b` differs by less than `tolerance`.
pub fn points_coincide(a: Vec3, b: Vec3, tolerance: f32) -> bool {
    (a - b).abs().cmplt(Vec3::splat(tolerance)).all()
}

/// Neighbours that continue `piece` at its current orientation.
///
/// Pure: nothing is linked or rotated.
pub fn find_matches(grid: &Grid, piece: PieceId) -> Connections {
    let mut found = Connections::default();
    let Some(this) = grid.piece(piece) else {
        return found;
    };
    let tolerance = grid.settings().connect_tolerance;
    let own = this.world_anchors(crate::data::Lane::Left);

    for tile in grid.tile(this.tile).adjacent.iter() {
        let Some(other_id) = grid.tile(tile).piece else {
            continue;
        };
        let Some(other) = grid.piece(other_id) else {
            continue;
        };
        let theirs = other.world_anchors(crate::data::Lane::Left);

        if points_coincide(own.exit, theirs.entry, tolerance) {
            found.end.get_or_insert(other_id);
        } else if points_coincide(own.entry, theirs.exit, tolerance) {
            found.start.get_or_insert(other_id);
        }
    }
    found
}

/// Resolve and apply the connections of `piece`.
///
/// With `retry` the piece turns a quarter at a time until some neighbour
/// fits. After all four orientations fail it is back where it began and
/// ends up unlinked. Neighbours updated as a side effect never retry.
pub fn resolve(grid: &mut Grid, piece: PieceId, retry: bool) -> Connections {
    if grid.piece(piece).is_none() {
        return Connections::default();
    }

    let attempts = if retry { ORIENTATIONS } else { 1 };
    let mut found = Connections::default();
    for _ in 0..attempts {
        found = find_matches(grid, piece);
        if !found.is_empty() {
            break;
        }
        if retry {
            if let Some(p) = grid.piece_mut(piece) {
                p.rotate(1);
            }
        }
    }

    detach(grid, piece);
    if let Some(start) = found.start {
        link(grid, start, piece);
    }
    if let Some(end) = found.end {
        link(grid, piece, end);
    }

    let connections = grid
        .piece(piece)
        .map(|p| p.connections)
        .unwrap_or_default();
    debug!(
        "Piece {:?} resolved: start={:?} end={:?}",
        piece, connections.start, connections.end
    );
    connections
}

/// Clear the links of `piece` and the matching back-links of its partners.
/// Returns the links it had.
pub fn detach(grid: &mut Grid, piece: PieceId) -> Connections {
    let Some(old) = grid.piece_mut(piece).map(|p| std::mem::take(&mut p.connections)) else {
        return Connections::default();
    };
    if let Some(start) = old.start {
        if let Some(p) = grid.piece_mut(start) {
            if p.connections.end == Some(piece) {
                p.connections.end = None;
            }
        }
    }
    if let Some(end) = old.end {
        if let Some(p) = grid.piece_mut(end) {
            if p.connections.start == Some(piece) {
                p.connections.start = None;
            }
        }
    }
    old
}

/// Make `to` follow `from`, dropping whatever each was linked to before.
fn link(grid: &mut Grid, from: PieceId, to: PieceId) {
    let previous_end = grid.piece(from).and_then(|p| p.connections.end);
    if let Some(old) = previous_end.filter(|&old| old != to) {
        if let Some(p) = grid.piece_mut(old) {
            if p.connections.start == Some(from) {
                p.connections.start = None;
            }
        }
    }

    let previous_start = grid.piece(to).and_then(|p| p.connections.start);
    if let Some(old) = previous_start.filter(|&old| old != from) {
        if let Some(p) = grid.piece_mut(old) {
            if p.connections.end == Some(to) {
                p.connections.end = None;
            }
        }
    }

    if let Some(p) = grid.piece_mut(from) {
        p.connections.end = Some(to);
    }
    if let Some(p) = grid.piece_mut(to) {
        p.connections.start = Some(from);
    }
}

/// True when every link in the grid is mirrored by its partner.
pub fn is_reciprocal(grid: &Grid) -> bool {
    grid.pieces().all(|(id, piece)| {
        let start_ok = piece
            .connections
            .start
            .map_or(true, |s| grid.piece(s).and_then(|p| p.connections.end) == Some(id));
        let end_ok = piece
            .connections
            .end
            .map_or(true, |e| grid.piece(e).and_then(|p| p.connections.start) == Some(id));
        start_ok && end_ok
    })
}
