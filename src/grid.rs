use crate::config::TrackSettings;
use crate::connectivity;
use crate::data::*;
use crate::piece::TrackPiece;
use crate::route::Route;
use glam::Vec3;
use tracing::{debug, info};

/// Tiles sharing an edge with a tile; `None` past the grid border.
///
/// `top`/`bottom` step along the column axis, `left`/`right` along rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjacentTiles {
    pub left: Option<TileId>,
    pub right: Option<TileId>,
    pub top: Option<TileId>,
    pub bottom: Option<TileId>,
}

impl AdjacentTiles {
    /// Present neighbours in the order connectivity checks them.
    pub fn iter(&self) -> impl Iterator<Item = TileId> {
        [self.left, self.right, self.top, self.bottom].into_iter().flatten()
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    pub row: usize,
    pub col: usize,
    pub adjacent: AdjacentTiles,
    pub piece: Option<PieceId>,
}

impl Tile {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.row as f32, -1.0, self.col as f32)
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    tiles: Vec<Tile>,
    pieces: Vec<Option<TrackPiece>>,
    free_slots: Vec<usize>,
    settings: TrackSettings,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, settings: TrackSettings) -> Self {
        let index = |row: usize, col: usize| TileId(row * cols + col);
        let mut tiles = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                tiles.push(Tile {
                    row,
                    col,
                    adjacent: AdjacentTiles {
                        left: (row > 0).then(|| index(row - 1, col)),
                        right: (row + 1 < rows).then(|| index(row + 1, col)),
                        top: (col > 0).then(|| index(row, col - 1)),
                        bottom: (col + 1 < cols).then(|| index(row, col + 1)),
                    },
                    piece: None,
                });
            }
        }

        Self {
            rows,
            cols,
            tiles,
            pieces: Vec::new(),
            free_slots: Vec::new(),
            settings,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn settings(&self) -> &TrackSettings {
        &self.settings
    }

    pub fn tile(&self, id: TileId) -> &Tile {
        &self.tiles[id.0]
    }

    pub fn tile_at(&self, row: usize, col: usize) -> Option<TileId> {
        (row < self.rows && col < self.cols).then(|| TileId(row * self.cols + col))
    }

    pub fn tiles(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles.iter().enumerate().map(|(i, t)| (TileId(i), t))
    }

    pub fn piece(&self, id: PieceId) -> Option<&TrackPiece> {
        self.pieces.get(id.0).and_then(Option::as_ref)
    }

    pub fn piece_mut(&mut self, id: PieceId) -> Option<&mut TrackPiece> {
        self.pieces.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn piece_on(&self, tile: TileId) -> Option<PieceId> {
        self.tiles.get(tile.0).and_then(|t| t.piece)
    }

    pub fn pieces(&self) -> impl Iterator<Item = (PieceId, &TrackPiece)> {
        self.pieces
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (PieceId(i), p)))
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len() - self.free_slots.len()
    }

    pub fn start_pieces(&self) -> Vec<PieceId> {
        self.pieces()
            .filter(|(_, p)| p.is_start())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn route(&self, start: PieceId, lane: Lane) -> Option<&Route> {
        self.piece(start)
            .and_then(|p| p.start.as_ref())
            .map(|slots| slots.route(lane))
    }

    /// Put a new piece of `kind` on an empty tile and let it turn to fit.
    pub fn place(&mut self, tile: TileId, kind: PieceKind) -> Option<PieceId> {
        if self.tiles.get(tile.0)?.piece.is_some() {
            debug!("Tile {:?} already occupied", tile);
            return None;
        }

        let piece = TrackPiece::new(
            kind,
            tile,
            self.tile(tile).position(),
            self.settings.route_quality,
        );
        let id = match self.free_slots.pop() {
            Some(slot) => {
                self.pieces[slot] = Some(piece);
                PieceId(slot)
            }
            None => {
                self.pieces.push(Some(piece));
                PieceId(self.pieces.len() - 1)
            }
        };
        self.tiles[tile.0].piece = Some(id);

        connectivity::resolve(self, id, true);
        self.regenerate_routes();

        let t = self.tile(tile);
        info!("{} piece placed at ({}, {})", kind, t.row, t.col);
        Some(id)
    }

    /// Take the piece off `tile`; its former neighbours re-resolve.
    pub fn remove(&mut self, tile: TileId) -> Option<TrackPiece> {
        let id = self.tiles.get(tile.0)?.piece?;
        let old = connectivity::detach(self, id);

        self.tiles[tile.0].piece = None;
        let piece = self.pieces[id.0].take()?;
        self.free_slots.push(id.0);

        for neighbour in [old.start, old.end].into_iter().flatten() {
            connectivity::resolve(self, neighbour, false);
        }
        self.regenerate_routes();

        info!(
            "{} piece removed from ({}, {})",
            piece.kind,
            self.tile(tile).row,
            self.tile(tile).col
        );
        Some(piece)
    }

    /// Turn the piece on `tile` back a quarter and refresh the links around it.
    pub fn rotate(&mut self, tile: TileId) -> bool {
        let Some(id) = self.piece_on(tile) else {
            return false;
        };
        let old = match self.piece_mut(id) {
            Some(piece) => {
                piece.rotate(-1);
                piece.connections
            }
            None => return false,
        };

        for neighbour in [old.start, old.end].into_iter().flatten() {
            connectivity::resolve(self, neighbour, false);
        }
        connectivity::resolve(self, id, false);
        self.regenerate_routes();

        if let Some(piece) = self.piece(id) {
            debug!("Piece {:?} rotated to {}°", id, piece.rotation.degrees());
        }
        true
    }

    /// Remove every piece, returning them.
    pub fn clear(&mut self) -> Vec<TrackPiece> {
        for tile in &mut self.tiles {
            tile.piece = None;
        }
        self.free_slots.clear();
        let removed: Vec<TrackPiece> = self.pieces.drain(..).flatten().collect();
        info!("Grid cleared ({} pieces)", removed.len());
        removed
    }

    /// Re-resolve every piece in place (no turning), then rebuild routes.
    pub fn refresh_connectivity(&mut self) {
        let ids: Vec<PieceId> = self.pieces().map(|(id, _)| id).collect();
        for id in ids {
            connectivity::resolve(self, id, false);
        }
        self.regenerate_routes();
    }

    /// Rebuild both lane routes of every Start piece from scratch.
    pub fn regenerate_routes(&mut self) {
        for start in self.start_pieces() {
            let routes = Lane::BOTH.map(|lane| Route::generate(self, start, lane));
            if let Some(slots) = self.piece_mut(start).and_then(|p| p.start.as_mut()) {
                for route in routes {
                    let lane = route.lane();
                    *slots.route_mut(lane) = route;
                }
            }
        }
    }
}
