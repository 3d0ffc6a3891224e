use crate::assets::{self, AssetLoader};
use crate::car::{Car, Tick};
use crate::config::{CarSettings, RaceSettings, SimConfig};
use crate::data::*;
use crate::grid::Grid;
use crate::input::{InputSource, LetterPool};
use crate::layout::{LayoutError, TrackLayout};
use crate::scoreboard::{ScoreLine, Scoreboard};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

/// What a click on a tile ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileAction {
    Placed(PieceId),
    Rotated,
    Removed(PieceKind),
    CarSpawned(CarId),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Countdown {
    started_at: f64,
    seconds: u32,
    announced: u32,
}

pub struct RaceSession {
    grid: Grid,
    cars: Vec<Car>,
    letters: LetterPool,
    places: PlacePool,
    clock: SimClock,
    countdown: Option<Countdown>,
    rng: StdRng,
    race: RaceSettings,
    car_settings: CarSettings,
    scoreboard: Box<dyn Scoreboard>,
    assets: Box<dyn AssetLoader>,
}

impl RaceSession {
    pub fn new(
        config: &SimConfig,
        scoreboard: Box<dyn Scoreboard>,
        assets: Box<dyn AssetLoader>,
    ) -> Self {
        let rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            grid: Grid::new(config.grid.rows, config.grid.cols, config.track),
            cars: Vec::new(),
            letters: LetterPool::new(),
            places: PlacePool::new(&config.race.places),
            clock: SimClock::default(),
            countdown: None,
            rng,
            race: config.race.clone(),
            car_settings: config.car,
            scoreboard,
            assets,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cars(&self) -> &[Car] {
        &self.cars
    }

    pub fn car(&self, id: CarId) -> Option<&Car> {
        self.cars.iter().find(|c| c.id == id)
    }

    pub fn letters(&self) -> &LetterPool {
        &self.letters
    }

    pub fn places(&self) -> &PlacePool {
        &self.places
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn is_counting_down(&self) -> bool {
        self.countdown.is_some()
    }

    /// Number currently shown by a running countdown (3, 2, 1).
    pub fn countdown_shown(&self) -> Option<u32> {
        self.countdown.map(|c| c.seconds - c.announced)
    }

    /// Replace the whole track with `layout`. Existing cars are removed.
    pub fn load_layout(&mut self, layout: &TrackLayout) -> Result<(), LayoutError> {
        let grid = layout.build(*self.grid.settings())?;
        self.remove_all_cars();
        self.grid = grid;

        let kinds: Vec<PieceKind> = self.grid.pieces().map(|(_, p)| p.kind).collect();
        for kind in kinds {
            assets::request_piece_assets(self.assets.as_mut(), kind);
        }
        Ok(())
    }

    /// Build-mode click on `tile` with the tool selected in `ctx`.
    ///
    /// An empty tile gets the selected piece. An occupied tile is rotated
    /// when `rotate_modifier` is held and cleared otherwise. With the car tool
    /// only Start tiles react.
    pub fn click_tile(&mut self, ctx: &SimContext, tile: TileId, rotate_modifier: bool) -> TileAction {
        if ctx.mode != AppMode::Build {
            debug!("Click on {:?} ignored in {:?}", tile, ctx.mode);
            return TileAction::Ignored;
        }

        let action = match (self.grid.piece_on(tile), ctx.selected_tool) {
            (None, PlacementTool::Piece(kind)) => self.place_piece(tile, kind).map(TileAction::Placed),
            (None, PlacementTool::Car) => None,
            (Some(_), PlacementTool::Car) => self.spawn_car(tile).map(TileAction::CarSpawned),
            (Some(_), PlacementTool::Piece(_)) if rotate_modifier => {
                self.rotate_piece(tile).then_some(TileAction::Rotated)
            }
            (Some(_), PlacementTool::Piece(_)) => self.remove_piece(tile).map(TileAction::Removed),
        };
        action.unwrap_or(TileAction::Ignored)
    }

    pub fn place_piece(&mut self, tile: TileId, kind: PieceKind) -> Option<PieceId> {
        let id = self.grid.place(tile, kind)?;
        assets::request_piece_assets(self.assets.as_mut(), kind);
        Some(id)
    }

    pub fn rotate_piece(&mut self, tile: TileId) -> bool {
        self.grid.rotate(tile)
    }

    /// Take a piece off the track. A Start piece's cars go first.
    pub fn remove_piece(&mut self, tile: TileId) -> Option<PieceKind> {
        let id = self.grid.piece_on(tile)?;
        let riders: Vec<CarId> = self
            .cars
            .iter()
            .filter(|c| c.start_piece == id)
            .map(|c| c.id)
            .collect();
        for car in riders {
            self.remove_car(car);
        }
        self.grid.remove(tile).map(|piece| piece.kind)
    }

    pub fn clear_track(&mut self) {
        self.remove_all_cars();
        self.grid.clear();
    }

    /// Put a car on the first free lane of the Start piece on `tile`.
    pub fn spawn_car(&mut self, tile: TileId) -> Option<CarId> {
        let start = self.grid.piece_on(tile)?;
        let lane = match self.grid.piece(start).and_then(|p| p.start.as_ref()) {
            Some(slots) => slots.free_lane(),
            None => {
                debug!("Tile {:?} holds no Start piece", tile);
                return None;
            }
        };
        let Some(lane) = lane else {
            debug!("Start piece {:?} already has two cars", start);
            return None;
        };
        let Some(button) = self.letters.draw(&mut self.rng) else {
            debug!("No control letters left");
            return None;
        };

        let mut car = Car::new(start, lane, button, self.car_settings, &mut self.rng);
        if let Some(route) = self.grid.route(start, lane) {
            car.reset(route);
        }
        if let Some(slots) = self.grid.piece_mut(start).and_then(|p| p.start.as_mut()) {
            *slots.car_slot_mut(lane) = Some(car.id);
        }

        self.scoreboard.create(&car);
        assets::request_car_assets(self.assets.as_mut());
        info!("Car {} spawned on {:?} lane {:?}", button, start, lane);

        let id = car.id;
        self.cars.push(car);
        Some(id)
    }

    /// Remove a car, handing its letter back to the pool.
    pub fn remove_car(&mut self, id: CarId) -> bool {
        let Some(index) = self.cars.iter().position(|c| c.id == id) else {
            return false;
        };
        let car = self.cars.remove(index);

        if let Some(slots) = self
            .grid
            .piece_mut(car.start_piece)
            .and_then(|p| p.start.as_mut())
        {
            let slot = slots.car_slot_mut(car.lane);
            if *slot == Some(id) {
                *slot = None;
            }
        }
        self.letters.release(car.button);
        self.scoreboard.remove(id);
        info!("Car {} removed", car.button);
        true
    }

    fn remove_all_cars(&mut self) {
        let ids: Vec<CarId> = self.cars.iter().map(|c| c.id).collect();
        for id in ids {
            self.remove_car(id);
        }
    }

    /// Leave build mode: refresh the track, refill the places and count down.
    pub fn start_race(&mut self, ctx: &mut SimContext, lap_target: u32) -> bool {
        if ctx.mode != AppMode::Build {
            return false;
        }
        ctx.lap_target = lap_target.max(1);
        self.places = PlacePool::new(&self.race.places);
        self.grid.refresh_connectivity();
        self.reset_cars();

        info!(
            "Race to {} laps with {} cars, starting in {}",
            ctx.lap_target,
            self.cars.len(),
            self.race.countdown_seconds
        );
        if self.race.countdown_seconds == 0 {
            ctx.mode = AppMode::Racing;
            info!("Go!");
        } else {
            ctx.mode = AppMode::Countdown;
            info!("{}", self.race.countdown_seconds);
            self.countdown = Some(Countdown {
                started_at: self.clock.now(),
                seconds: self.race.countdown_seconds,
                announced: 0,
            });
        }
        true
    }

    /// Back to build mode; cars return to the start line.
    pub fn stop_race(&mut self, ctx: &mut SimContext) {
        ctx.mode = AppMode::Build;
        self.countdown = None;
        self.reset_cars();
        info!("Race stopped");
    }

    fn reset_cars(&mut self) {
        for car in &mut self.cars {
            if let Some(route) = self.grid.route(car.start_piece, car.lane) {
                car.reset(route);
            }
        }
    }

    /// Advance the session by `dt` seconds.
    pub fn tick(&mut self, ctx: &mut SimContext, input: &dyn InputSource, dt: f32) {
        self.clock.advance(dt);
        self.tick_countdown(ctx);

        let tick = Tick {
            now: self.clock.now(),
            dt,
        };
        for car in &mut self.cars {
            let Some(route) = self.grid.route(car.start_piece, car.lane) else {
                continue;
            };
            car.update(ctx, tick, route, input, &mut self.places, &mut self.rng);
            self.scoreboard.update(car.id, &ScoreLine::from_car(car));
        }
    }

    fn tick_countdown(&mut self, ctx: &mut SimContext) {
        let Some(mut countdown) = self.countdown else {
            return;
        };
        if ctx.mode != AppMode::Countdown {
            self.countdown = None;
            return;
        }

        let elapsed = self.clock.now() - countdown.started_at;
        let passed = (elapsed.floor() as u32).min(countdown.seconds);
        while countdown.announced < passed {
            countdown.announced += 1;
            if countdown.announced < countdown.seconds {
                info!("{}", countdown.seconds - countdown.announced);
            }
        }

        if elapsed >= countdown.seconds as f64 {
            ctx.mode = AppMode::Racing;
            self.countdown = None;
            info!("Go!");
        } else {
            self.countdown = Some(countdown);
        }
    }

    /// Cars ordered by finishing place, then laps, then distance covered.
    pub fn standings(&self) -> Vec<&Car> {
        let rank = |car: &Car| {
            car.place
                .as_ref()
                .and_then(|p| self.race.places.iter().position(|label| label == p))
                .unwrap_or(usize::MAX)
        };
        let mut cars: Vec<&Car> = self.cars.iter().collect();
        cars.sort_by(|a, b| {
            rank(a)
                .cmp(&rank(b))
                .then(b.laps.cmp(&a.laps))
                .then(b.distance_on_track.total_cmp(&a.distance_on_track))
        });
        cars
    }
}
