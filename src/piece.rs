use crate::data::*;
use crate::route::Route;
use glam::{Quat, Vec3};

/// Lateral distance of each lane from the piece centre line.
pub const LANE_OFFSET: f32 = 0.13;

/// Entry, control and exit point of one lane, forming a quadratic curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneAnchors {
    pub entry: Vec3,
    pub control: Vec3,
    pub exit: Vec3,
}

impl LaneAnchors {
    const fn new(entry: [f32; 3], control: [f32; 3], exit: [f32; 3]) -> Self {
        Self {
            entry: Vec3::from_array(entry),
            control: Vec3::from_array(control),
            exit: Vec3::from_array(exit),
        }
    }

    pub fn map(&self, f: impl Fn(Vec3) -> Vec3) -> Self {
        Self {
            entry: f(self.entry),
            control: f(self.control),
            exit: f(self.exit),
        }
    }
}

const O: f32 = LANE_OFFSET;

const STRAIGHT_LEFT: LaneAnchors = LaneAnchors::new([O, 0.0, -0.49], [O, 0.0, 0.0], [O, 0.0, 0.5]);
const STRAIGHT_RIGHT: LaneAnchors =
    LaneAnchors::new([-O, 0.0, -0.49], [-O, 0.0, 0.0], [-O, 0.0, 0.5]);

// Turns enter on the +Z edge; the inner lane hugs the corner more tightly.
const RIGHT_LEFT: LaneAnchors = LaneAnchors::new(
    [-O, 0.0, 0.49],
    [-O + 0.065, 0.0, -O + 0.065],
    [0.5, 0.0, -O],
);
const RIGHT_RIGHT: LaneAnchors =
    LaneAnchors::new([O, 0.0, 0.49], [O + 0.03, 0.0, O + 0.03], [0.5, 0.0, O]);
const LEFT_LEFT: LaneAnchors =
    LaneAnchors::new([-O, 0.0, 0.49], [-O - 0.03, 0.0, O + 0.03], [-0.5, 0.0, O]);
const LEFT_RIGHT: LaneAnchors = LaneAnchors::new(
    [O, 0.0, 0.49],
    [O - 0.065, 0.0, -O + 0.065],
    [-0.5, 0.0, -O],
);

impl PieceKind {
    /// Lane anchors in the piece's local frame.
    pub fn lane_anchors(self, lane: Lane) -> LaneAnchors {
        match (self, lane) {
            (PieceKind::Straight | PieceKind::Start, Lane::Left) => STRAIGHT_LEFT,
            (PieceKind::Straight | PieceKind::Start, Lane::Right) => STRAIGHT_RIGHT,
            (PieceKind::Right, Lane::Left) => RIGHT_LEFT,
            (PieceKind::Right, Lane::Right) => RIGHT_RIGHT,
            (PieceKind::Left, Lane::Left) => LEFT_LEFT,
            (PieceKind::Left, Lane::Right) => LEFT_RIGHT,
        }
    }

    /// Orientation a freshly placed piece starts from.
    pub fn initial_rotation(self) -> Rotation {
        match self {
            PieceKind::Start => Rotation::Deg180,
            _ => Rotation::Deg0,
        }
    }

    pub fn model_path(self) -> String {
        format!("models/TrackPieces/{0}/{0}.glb", self.name())
    }

    pub fn texture_dir(self) -> String {
        format!("texture/TrackPieces/{}/", self.name())
    }
}

/// Car slots and lane routes owned by a Start piece.
#[derive(Debug, Clone)]
pub struct StartSlots {
    pub left_car: Option<CarId>,
    pub right_car: Option<CarId>,
    pub left_route: Route,
    pub right_route: Route,
}

impl StartSlots {
    pub fn new(route_quality: f32) -> Self {
        Self {
            left_car: None,
            right_car: None,
            left_route: Route::new(Lane::Left, route_quality),
            right_route: Route::new(Lane::Right, route_quality),
        }
    }

    pub fn car(&self, lane: Lane) -> Option<CarId> {
        match lane {
            Lane::Left => self.left_car,
            Lane::Right => self.right_car,
        }
    }

    pub fn car_slot_mut(&mut self, lane: Lane) -> &mut Option<CarId> {
        match lane {
            Lane::Left => &mut self.left_car,
            Lane::Right => &mut self.right_car,
        }
    }

    /// First empty car slot, left before right.
    pub fn free_lane(&self) -> Option<Lane> {
        Lane::BOTH.into_iter().find(|&lane| self.car(lane).is_none())
    }

    pub fn route(&self, lane: Lane) -> &Route {
        match lane {
            Lane::Left => &self.left_route,
            Lane::Right => &self.right_route,
        }
    }

    pub fn route_mut(&mut self, lane: Lane) -> &mut Route {
        match lane {
            Lane::Left => &mut self.left_route,
            Lane::Right => &mut self.right_route,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackPiece {
    pub kind: PieceKind,
    pub tile: TileId,
    /// World position of the piece's local origin (its tile's position).
    pub origin: Vec3,
    pub rotation: Rotation,
    pub connections: Connections,
    /// Present exactly when `kind` is `Start`.
    pub start: Option<StartSlots>,
}

impl TrackPiece {
    pub fn new(kind: PieceKind, tile: TileId, origin: Vec3, route_quality: f32) -> Self {
        Self {
            kind,
            tile,
            origin,
            rotation: kind.initial_rotation(),
            connections: Connections::default(),
            start: (kind == PieceKind::Start).then(|| StartSlots::new(route_quality)),
        }
    }

    pub fn is_start(&self) -> bool {
        self.start.is_some()
    }

    pub fn rotate(&mut self, quarter_turns: i32) {
        self.rotation = self.rotation.turned(quarter_turns);
    }

    pub fn orientation(&self) -> Quat {
        self.rotation.quat()
    }

    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.origin + self.orientation() * local
    }

    pub fn to_local(&self, world: Vec3) -> Vec3 {
        self.orientation().inverse() * (world - self.origin)
    }

    pub fn world_anchors(&self, lane: Lane) -> LaneAnchors {
        self.kind.lane_anchors(lane).map(|p| self.to_world(p))
    }
}
