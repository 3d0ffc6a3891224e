//! Car motion along a lane route.
//!
//! A car is posed at the route start while the race is not running. During a
//! race it accelerates while its key is held, coasts otherwise, and may veer
//! off the track for a while when it takes a bend too fast.

use crate::config::CarSettings;
use crate::data::*;
use crate::input::InputSource;
use crate::route::Route;
use glam::Vec3;
use rand::Rng;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionState {
    Idle,
    Racing,
    /// Off the route, moving straight ahead until `until` (simulation seconds).
    Veered { until: f64 },
}

/// Time of the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub now: f64,
    pub dt: f32,
}

#[derive(Debug, Clone)]
pub struct Car {
    pub id: CarId,
    /// Start piece whose lane route this car follows.
    pub start_piece: PieceId,
    pub lane: Lane,
    pub button: char,
    pub color: HslColor,
    pub velocity: f32,
    pub max_velocity: f32,
    /// Fractional index into the route's points, in `[0, len)`.
    pub distance_on_track: f32,
    pub laps: u32,
    pub place: Option<String>,
    pub state: MotionState,
    /// Position in the Start piece's local frame.
    pub position: Vec3,
    /// Unit heading in the Start piece's local frame.
    pub forward: Vec3,
    settings: CarSettings,
}

fn sample_range(rng: &mut impl Rng, min: f32, max: f32) -> f32 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

impl Car {
    pub fn new(
        start_piece: PieceId,
        lane: Lane,
        button: char,
        settings: CarSettings,
        rng: &mut impl Rng,
    ) -> Self {
        Self {
            id: CarId::new_v4(),
            start_piece,
            lane,
            button,
            color: HslColor::random(rng),
            velocity: 0.0,
            max_velocity: sample_range(rng, settings.max_velocity_min, settings.max_velocity_max),
            distance_on_track: 0.0,
            laps: 0,
            place: None,
            state: MotionState::Idle,
            position: PieceKind::Start.lane_anchors(lane).entry,
            forward: Vec3::Z,
            settings,
        }
    }

    pub fn settings(&self) -> &CarSettings {
        &self.settings
    }

    pub fn is_veered(&self) -> bool {
        matches!(self.state, MotionState::Veered { .. })
    }

    /// Heading away from straight ahead, in degrees within [-90, 90].
    pub fn yaw_degrees(&self) -> f32 {
        self.forward.x.clamp(-1.0, 1.0).asin().to_degrees()
    }

    /// Per-frame update. Outside of a race the car is reset to the start;
    /// with an empty route nothing happens.
    pub fn update(
        &mut self,
        ctx: &SimContext,
        tick: Tick,
        route: &Route,
        input: &dyn InputSource,
        places: &mut PlacePool,
        rng: &mut impl Rng,
    ) {
        if ctx.mode != AppMode::Racing {
            self.reset(route);
            return;
        }
        if route.is_empty() {
            return;
        }

        match self.state {
            MotionState::Veered { until } if tick.now >= until => {
                debug!("Car {} back on track", self.button);
                self.state = MotionState::Racing;
                self.velocity = 0.0;
            }
            MotionState::Idle => self.state = MotionState::Racing,
            _ => {}
        }

        if self.state == MotionState::Racing && self.rolls_veer(rng) {
            info!("Car {} veered off at {:.0}", self.button, self.velocity);
            self.state = MotionState::Veered {
                until: tick.now + self.settings.veer_duration_secs as f64,
            };
        }

        if self.is_veered() {
            let speed = self.velocity / self.settings.veer_speed_divisor;
            self.position += self.forward * speed * tick.dt;
            return;
        }

        if input.is_pressed(self.button) {
            let acceleration = if self.velocity < self.max_velocity {
                sample_range(rng, self.settings.acceleration_min, self.settings.acceleration_max)
            } else {
                0.0
            };
            self.velocity += acceleration * tick.dt;
        } else {
            let friction =
                sample_range(rng, self.settings.friction_min, self.settings.friction_max) * tick.dt;
            self.velocity = if self.velocity < self.settings.stop_epsilon {
                0.0
            } else {
                (self.velocity - friction).max(0.0)
            };
        }

        self.advance(self.velocity * tick.dt, route.len(), ctx.lap_target, places);
        self.look_ahead(route);
        self.follow(route);
    }

    /// Move `step` samples along a route of `point_count` points. Returns true
    /// when a lap was completed.
    pub fn advance(
        &mut self,
        step: f32,
        point_count: usize,
        lap_target: u32,
        places: &mut PlacePool,
    ) -> bool {
        if point_count < 2 {
            return false;
        }
        self.distance_on_track += step;
        if self.distance_on_track / ((point_count - 1) as f32) < 1.0 {
            return false;
        }

        self.distance_on_track -= self.distance_on_track.floor();
        self.laps += 1;
        if self.laps == lap_target {
            self.place = places.take();
            match &self.place {
                Some(place) => info!("Car {} finished {}", self.button, place),
                None => info!("Car {} finished unplaced", self.button),
            }
        } else {
            debug!("Car {} completed lap {}", self.button, self.laps);
        }
        true
    }

    /// Back to the starting line at rest.
    pub fn reset(&mut self, route: &Route) {
        self.distance_on_track = 0.0;
        self.velocity = 0.0;
        self.laps = 0;
        self.place = None;
        self.state = MotionState::Idle;
        if !route.is_empty() {
            self.look_ahead(route);
            self.follow(route);
        }
    }

    fn rolls_veer(&self, rng: &mut impl Rng) -> bool {
        let s = &self.settings;
        let yaw = self.yaw_degrees().abs();
        if yaw <= s.veer_yaw_min_deg || yaw >= s.veer_yaw_max_deg {
            return false;
        }
        if self.velocity <= s.veer_speed_threshold {
            return false;
        }

        let headroom = (self.max_velocity - s.veer_speed_threshold).max(f32::EPSILON);
        let overspeed = (self.velocity - s.veer_speed_threshold) / headroom;
        let chance: f32 = rng.gen_range(0.0..100.0);
        let penalty = rng.gen::<f32>() * 5.0 * overspeed;
        chance < rng.gen::<f32>() * 5.0 + penalty
    }

    fn look_ahead(&mut self, route: &Route) {
        let ahead = (self.distance_on_track + self.settings.lookahead_samples)
            .rem_euclid(route.len() as f32);
        if let Some(target) = route.point_at(ahead) {
            let direction = (target - self.position).normalize_or_zero();
            if direction != Vec3::ZERO {
                self.forward = direction;
            }
        }
    }

    fn follow(&mut self, route: &Route) {
        if let Some(point) = route.point_at(self.distance_on_track) {
            self.position.x = point.x;
            self.position.z = point.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::KeyboardState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::f32::consts::TAU;

    fn ring_route(n: usize) -> Route {
        let points = (0..n)
            .map(|i| {
                let angle = i as f32 / n as f32 * TAU;
                Vec3::new(2.0 * angle.cos(), 0.0, 2.0 * angle.sin())
            })
            .collect();
        Route::from_points(Lane::Left, 100.0, points)
    }

    fn create_test_car(rng: &mut StdRng) -> Car {
        Car::new(PieceId(0), Lane::Left, 'K', CarSettings::default(), rng)
    }

    fn places() -> PlacePool {
        PlacePool::new(&["1st".to_string(), "2nd".to_string()])
    }

    fn racing() -> SimContext {
        SimContext {
            mode: AppMode::Racing,
            ..SimContext::new(3)
        }
    }

    #[test]
    fn test_new_car_ranges() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let car = create_test_car(&mut rng);
            assert!((550.0..650.0).contains(&car.max_velocity));
            assert!(car.color.hue < 360);
            assert!((20..100).contains(&car.color.saturation));
            assert_eq!(car.state, MotionState::Idle);
        }
    }

    #[test]
    fn test_lap_counted_once_per_traversal() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut car = create_test_car(&mut rng);
        let mut pool = places();
        let len = 101;

        let mut laps_completed = 0;
        for _ in 0..4 {
            if car.advance(25.0, len, 3, &mut pool) {
                laps_completed += 1;
            }
            assert!(car.distance_on_track >= 0.0);
        }
        assert_eq!(laps_completed, 1);
        assert_eq!(car.laps, 1);
        assert_eq!(car.distance_on_track, 0.0);
    }

    #[test]
    fn test_wrap_keeps_fraction() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut car = create_test_car(&mut rng);
        let mut pool = places();
        car.distance_on_track = 99.0;
        assert!(car.advance(2.5, 101, 3, &mut pool));
        assert!((car.distance_on_track - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_place_awarded_at_lap_target() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut first = create_test_car(&mut rng);
        let mut second = create_test_car(&mut rng);
        let mut third = create_test_car(&mut rng);
        let mut pool = places();

        for car in [&mut first, &mut second, &mut third] {
            car.advance(10.0, 11, 1, &mut pool);
        }
        assert_eq!(first.place.as_deref(), Some("1st"));
        assert_eq!(second.place.as_deref(), Some("2nd"));
        assert_eq!(third.place, None);
        assert_eq!(third.laps, 1);
    }

    #[test]
    fn test_empty_route_is_noop() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut car = create_test_car(&mut rng);
        let route = Route::new(Lane::Left, 100.0);
        let mut keyboard = KeyboardState::new();
        keyboard.press('K');

        let tick = Tick { now: 0.0, dt: 1.0 / 60.0 };
        car.update(&racing(), tick, &route, &keyboard, &mut places(), &mut rng);
        assert_eq!(car.velocity, 0.0);
        assert_eq!(car.state, MotionState::Idle);
    }

    #[test]
    fn test_held_key_accelerates() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut car = create_test_car(&mut rng);
        let route = ring_route(400);
        let mut keyboard = KeyboardState::new();
        keyboard.press('K');

        let dt = 1.0 / 60.0;
        for i in 0..60 {
            let tick = Tick { now: i as f64 * dt as f64, dt };
            car.update(&racing(), tick, &route, &keyboard, &mut places(), &mut rng);
        }
        // One second of throttle at 100..150 per second.
        assert!(car.velocity >= 99.0 && car.velocity <= 151.0, "velocity {}", car.velocity);
        assert!(car.distance_on_track > 0.0);
        assert_eq!(car.state, MotionState::Racing);
    }

    #[test]
    fn test_veer_recovers_with_zero_velocity() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut car = create_test_car(&mut rng);
        let route = ring_route(400);
        car.velocity = 300.0;
        car.forward = Vec3::X;
        car.state = MotionState::Veered { until: 1.0 };
        let keyboard = KeyboardState::new();

        let before = car.position;
        let tick = Tick { now: 0.5, dt: 0.1 };
        car.update(&racing(), tick, &route, &keyboard, &mut places(), &mut rng);
        assert!(car.is_veered());
        assert!((car.position - before - Vec3::new(0.3, 0.0, 0.0)).length() < 1e-4);

        let tick = Tick { now: 1.0, dt: 0.1 };
        car.update(&racing(), tick, &route, &keyboard, &mut places(), &mut rng);
        assert_eq!(car.state, MotionState::Racing);
        assert_eq!(car.velocity, 0.0);
    }

    #[test]
    fn test_no_veer_below_speed_threshold() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut car = create_test_car(&mut rng);
        car.forward = Vec3::new(1.0, 0.0, 1.0).normalize();
        car.velocity = 450.0;
        assert!((0..1000).all(|_| !car.rolls_veer(&mut rng)));

        car.velocity = 600.0;
        car.forward = Vec3::Z;
        assert!((0..1000).all(|_| !car.rolls_veer(&mut rng)));
    }

    #[test]
    fn test_fast_car_in_bend_eventually_veers() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut car = create_test_car(&mut rng);
        car.forward = Vec3::new(1.0, 0.0, 1.0).normalize();
        car.velocity = car.max_velocity;
        assert!((0..10_000).any(|_| car.rolls_veer(&mut rng)));
    }

    #[test]
    fn test_coasting_snaps_to_zero() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut car = create_test_car(&mut rng);
        let route = ring_route(400);
        let keyboard = KeyboardState::new();
        car.velocity = 3.0;

        let tick = Tick { now: 0.0, dt: 1.0 / 60.0 };
        car.update(&racing(), tick, &route, &keyboard, &mut places(), &mut rng);
        assert_eq!(car.velocity, 0.0);
    }

    #[test]
    fn test_build_mode_resets() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut car = create_test_car(&mut rng);
        let route = ring_route(400);
        car.velocity = 300.0;
        car.laps = 2;
        car.distance_on_track = 50.0;
        car.place = Some("1st".to_string());

        let tick = Tick { now: 0.0, dt: 1.0 / 60.0 };
        let build = SimContext::new(3);
        car.update(&build, tick, &route, &KeyboardState::new(), &mut places(), &mut rng);
        assert_eq!(car.velocity, 0.0);
        assert_eq!(car.laps, 0);
        assert_eq!(car.place, None);
        let start = route.point_at(0.0).unwrap();
        assert!((car.position.x - start.x).abs() < 1e-5);
        assert!((car.position.z - start.z).abs() < 1e-5);
    }
}
