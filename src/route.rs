//! Lane routes: one quadratic Bezier segment per piece along the loop,
//! sampled into a dense cyclic polyline that cars read positions from.
//!
//! Route points live in the owning Start piece's local frame.

use crate::data::{Lane, PieceId};
use crate::grid::Grid;
use crate::piece::LaneAnchors;
use glam::Vec3;
use tracing::{debug, warn};

/// Chord subdivisions used to estimate a segment's arc length.
pub const ARC_LENGTH_DIVISIONS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticBezier {
    pub p0: Vec3,
    pub p1: Vec3,
    pub p2: Vec3,
}

impl QuadraticBezier {
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        Self { p0, p1, p2 }
    }

    pub fn point(&self, t: f32) -> Vec3 {
        let u = 1.0 - t;
        u * u * self.p0 + 2.0 * u * t * self.p1 + t * t * self.p2
    }

    pub fn arc_length(&self) -> f32 {
        let mut length = 0.0;
        let mut previous = self.p0;
        for i in 1..=ARC_LENGTH_DIVISIONS {
            let current = self.point(i as f32 / ARC_LENGTH_DIVISIONS as f32);
            length += current.distance(previous);
            previous = current;
        }
        length
    }

    /// `divisions + 1` evenly spaced points in t, both ends included.
    pub fn sample(&self, divisions: usize) -> impl Iterator<Item = Vec3> + '_ {
        let divisions = divisions.max(1);
        (0..=divisions).map(move |i| self.point(i as f32 / divisions as f32))
    }
}

impl From<LaneAnchors> for QuadraticBezier {
    fn from(anchors: LaneAnchors) -> Self {
        Self::new(anchors.entry, anchors.control, anchors.exit)
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    lane: Lane,
    /// Samples per world unit of segment length.
    quality: f32,
    segments: Vec<QuadraticBezier>,
    points: Vec<Vec3>,
    closed: bool,
}

impl Route {
    pub fn new(lane: Lane, quality: f32) -> Self {
        Self {
            lane,
            quality,
            segments: Vec::new(),
            points: Vec::new(),
            closed: false,
        }
    }

    /// A closed route over already sampled points.
    pub fn from_points(lane: Lane, quality: f32, points: Vec<Vec3>) -> Self {
        Self {
            lane,
            quality,
            segments: Vec::new(),
            closed: !points.is_empty(),
            points,
        }
    }

    /// Walk the chain from `start` along `connections.end` and sample it.
    ///
    /// An open chain (or one longer than the number of placed pieces) yields
    /// a route with no points.
    pub fn generate(grid: &Grid, start: PieceId, lane: Lane) -> Self {
        let mut route = Self::new(lane, grid.settings().route_quality);
        let Some(origin) = grid.piece(start) else {
            return route;
        };

        let max_steps = grid.piece_count();
        let mut current = start;
        for step in 1.. {
            let Some(piece) = grid.piece(current) else {
                break;
            };
            let anchors = piece
                .world_anchors(lane)
                .map(|p| origin.to_local(p));
            route.segments.push(anchors.into());

            match piece.connections.end {
                Some(next) if next == start => {
                    route.closed = true;
                    break;
                }
                Some(_) if step >= max_steps => {
                    warn!("Route walk from {:?} exceeded {} pieces", start, max_steps);
                    break;
                }
                Some(next) => current = next,
                None => break,
            }
        }

        if route.closed {
            route.points = route.sample_segments();
        }
        debug!(
            "Route {:?}/{:?}: {} segments, {} points, closed={}",
            start,
            lane,
            route.segments.len(),
            route.points.len(),
            route.closed
        );
        route
    }

    fn sample_segments(&self) -> Vec<Vec3> {
        self.segments
            .iter()
            .flat_map(|segment| {
                let divisions = (self.quality * segment.arc_length()).round() as usize;
                segment.sample(divisions)
            })
            .collect()
    }

    pub fn lane(&self) -> Lane {
        self.lane
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn segments(&self) -> &[QuadraticBezier] {
        &self.segments
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The two samples around index `t` and the blend between them.
    fn bracket(&self, t: f32) -> Option<(Vec3, Vec3, f32)> {
        let len = self.points.len();
        if len == 0 || !t.is_finite() {
            return None;
        }
        let t = t.rem_euclid(len as f32);
        let lower = (t.floor() as usize).min(len - 1);
        let upper = (lower + 1) % len;
        Some((self.points[lower], self.points[upper], t - lower as f32))
    }

    /// Position at fractional sample index `t`, interpolated linearly toward
    /// the next sample (wrapping). Integer `t` gives the sample itself.
    pub fn point_at(&self, t: f32) -> Option<Vec3> {
        let (a, b, blend) = self.bracket(t)?;
        if blend == 0.0 {
            return Some(a);
        }
        Some(a.lerp(b, blend))
    }

    /// Direction from the sample below `t` to the one after it.
    pub fn tangent_at(&self, t: f32) -> Option<Vec3> {
        let (a, b, _) = self.bracket(t)?;
        Some((b - a).normalize_or_zero())
    }
}
