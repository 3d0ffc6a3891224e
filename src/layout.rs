use crate::config::TrackSettings;
use crate::data::PieceKind;
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("failed to read layout: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("grid must have at least one row and column, got {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("piece at ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("tile ({row}, {col}) is used twice")]
    Duplicate { row: usize, col: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiecePlacement {
    pub row: usize,
    pub col: usize,
    pub kind: PieceKind,
    /// Extra quarter turns applied after placement, as repeated rotate clicks.
    #[serde(default)]
    pub turns: u8,
}

impl PiecePlacement {
    pub fn new(row: usize, col: usize, kind: PieceKind) -> Self {
        Self {
            row,
            col,
            kind,
            turns: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackLayout {
    #[serde(default)]
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub pieces: Vec<PiecePlacement>,
}

impl TrackLayout {
    /// The 12-piece loop the builder opens with.
    pub fn default_loop() -> Self {
        use PieceKind::*;
        let pieces = [
            (1, 4, Start),
            (1, 3, Straight),
            (1, 2, Straight),
            (1, 1, Right),
            (2, 1, Straight),
            (3, 1, Right),
            (3, 2, Straight),
            (3, 3, Straight),
            (3, 4, Straight),
            (3, 5, Right),
            (2, 5, Straight),
            (1, 5, Right),
        ]
        .into_iter()
        .map(|(row, col, kind)| PiecePlacement::new(row, col, kind))
        .collect();

        Self {
            name: "Default loop".to_string(),
            rows: 10,
            cols: 7,
            pieces,
        }
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(LayoutError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }

        let mut used = HashSet::new();
        for p in &self.pieces {
            if p.row >= self.rows || p.col >= self.cols {
                return Err(LayoutError::OutOfBounds {
                    row: p.row,
                    col: p.col,
                    rows: self.rows,
                    cols: self.cols,
                });
            }
            if !used.insert((p.row, p.col)) {
                return Err(LayoutError::Duplicate {
                    row: p.row,
                    col: p.col,
                });
            }
        }
        Ok(())
    }

    /// Replay the placements onto an empty grid.
    pub fn build(&self, settings: TrackSettings) -> Result<Grid, LayoutError> {
        self.validate()?;
        let mut grid = Grid::new(self.rows, self.cols, settings);
        self.apply(&mut grid);
        Ok(grid)
    }

    /// Place every piece on `grid`, skipping tiles outside it or occupied.
    pub fn apply(&self, grid: &mut Grid) {
        for p in &self.pieces {
            let Some(tile) = grid.tile_at(p.row, p.col) else {
                continue;
            };
            if grid.place(tile, p.kind).is_none() {
                continue;
            }
            for _ in 0..p.turns % 4 {
                grid.rotate(tile);
            }
        }
        info!(
            "Layout '{}' applied: {} pieces on {}x{}",
            self.name,
            grid.piece_count(),
            grid.rows(),
            grid.cols()
        );
    }
}

pub struct LayoutLoader;

impl LayoutLoader {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<TrackLayout, LayoutError> {
        let content = fs::read_to_string(path)?;
        Self::load_from_string(&content)
    }

    pub fn load_from_string(content: &str) -> Result<TrackLayout, LayoutError> {
        let layout: TrackLayout = if content.trim_start().starts_with('{') {
            serde_json::from_str(content)?
        } else {
            serde_yaml::from_str(content)?
        };
        layout.validate()?;
        Ok(layout)
    }
}
