use glam::Quat;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::f32::consts::FRAC_PI_2;
use std::fmt;
use uuid::Uuid;

// --- Identifiers ---
pub type CarId = Uuid;

/// Index of a tile in the grid's tile arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub usize);

/// Index of a piece slot in the grid's piece arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PieceId(pub usize);

// --- Track Pieces ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Straight,
    Left,
    Right,
    Start,
}

impl PieceKind {
    pub const ALL: [PieceKind; 4] = [
        PieceKind::Straight,
        PieceKind::Left,
        PieceKind::Right,
        PieceKind::Start,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::Straight => "Straight",
            PieceKind::Left => "Left",
            PieceKind::Right => "Right",
            PieceKind::Start => "Start",
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the two parallel paths through a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Left,
    Right,
}

impl Lane {
    pub const BOTH: [Lane; 2] = [Lane::Left, Lane::Right];
}

/// Orientation of a piece in quarter turns about the vertical axis.
///
/// One quarter turn is +90° about +Y, which carries local +X onto -Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Rotation {
    #[default]
    Deg0 = 0,
    Deg90 = 1,
    Deg180 = 2,
    Deg270 = 3,
}

impl Rotation {
    pub fn from_quarter_turns(turns: i32) -> Self {
        match turns.rem_euclid(4) {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn quarter_turns(self) -> i32 {
        self as i32
    }

    /// Rotation after `turns` further quarter turns (negative turns go back).
    pub fn turned(self, turns: i32) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + turns)
    }

    pub fn degrees(self) -> f32 {
        self.quarter_turns() as f32 * 90.0
    }

    pub fn quat(self) -> Quat {
        Quat::from_rotation_y(self.quarter_turns() as f32 * FRAC_PI_2)
    }
}

/// Pieces immediately before and after a piece along lane "left".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Connections {
    pub start: Option<PieceId>,
    pub end: Option<PieceId>,
}

impl Connections {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

// --- Simulation Context ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppMode {
    #[default]
    Build,
    Countdown,
    Racing,
}

/// What a click on a tile does in build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementTool {
    Piece(PieceKind),
    Car,
}

impl Default for PlacementTool {
    fn default() -> Self {
        PlacementTool::Piece(PieceKind::Straight)
    }
}

/// Race-wide state settable from the outside and passed into every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimContext {
    pub mode: AppMode,
    pub lap_target: u32,
    pub selected_tool: PlacementTool,
}

impl SimContext {
    pub fn new(lap_target: u32) -> Self {
        Self {
            mode: AppMode::Build,
            lap_target,
            selected_tool: PlacementTool::default(),
        }
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Monotonic simulation time, advanced only by ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    elapsed: f64,
}

impl SimClock {
    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0) as f64;
    }

    pub fn now(&self) -> f64 {
        self.elapsed
    }
}

// --- Race Results ---

/// Finishing place labels handed out in order, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacePool {
    remaining: Vec<String>,
}

impl PlacePool {
    /// `labels` are given best first ("1st", "2nd", ...).
    pub fn new(labels: &[String]) -> Self {
        Self {
            remaining: labels.iter().rev().cloned().collect(),
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.remaining.pop()
    }

    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }
}

/// Display color of a car.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HslColor {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl HslColor {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            hue: rng.gen_range(0..360),
            saturation: rng.gen_range(20..100),
            lightness: rng.gen_range(20..80),
        }
    }
}

impl fmt::Display for HslColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({}, {}%, {}%)", self.hue, self.saturation, self.lightness)
    }
}
