use std::io::Write;

use tile_racer::assets::NullAssetLoader;
use tile_racer::config::{SimConfig, TrackSettings};
use tile_racer::connectivity;
use tile_racer::data::*;
use tile_racer::grid::Grid;
use tile_racer::input::Autopilot;
use tile_racer::layout::{LayoutLoader, TrackLayout};
use tile_racer::race::RaceSession;
use tile_racer::scoreboard::TracingScoreboard;

use rand::rngs::StdRng;
use rand::SeedableRng;

fn default_grid() -> Grid {
    TrackLayout::default_loop()
        .build(TrackSettings::default())
        .expect("default layout builds")
}

fn piece_at(grid: &Grid, row: usize, col: usize) -> PieceId {
    grid.piece_on(grid.tile_at(row, col).unwrap()).unwrap()
}

#[test]
fn test_default_layout_is_one_closed_loop() {
    let grid = default_grid();
    assert_eq!(grid.piece_count(), 12);
    assert!(connectivity::is_reciprocal(&grid));

    let start = grid.start_pieces()[0];
    let mut seen = vec![start];
    let mut current = grid.piece(start).unwrap().connections.end.unwrap();
    while current != start {
        assert!(!seen.contains(&current), "loop revisits {:?}", current);
        seen.push(current);
        current = grid.piece(current).unwrap().connections.end.unwrap();
    }
    assert_eq!(seen.len(), 12);
}

#[test]
fn test_routes_return_to_start() {
    let grid = default_grid();
    let start = grid.start_pieces()[0];
    let tolerance = grid.settings().connect_tolerance;

    for lane in Lane::BOTH {
        let route = grid.route(start, lane).unwrap();
        assert!(route.is_closed());
        let first = route.points()[0];
        let last = *route.points().last().unwrap();
        assert!(
            connectivity::points_coincide(first, last, tolerance),
            "{:?} lane ends at {} instead of {}",
            lane,
            last,
            first
        );
        // Consecutive samples never jump more than a segment seam.
        for pair in route.points().windows(2) {
            assert!(pair[0].distance(pair[1]) < 0.05);
        }
    }
}

#[test]
fn test_route_starts_at_start_lane_entry() {
    let grid = default_grid();
    let start = grid.start_pieces()[0];
    for lane in Lane::BOTH {
        let route = grid.route(start, lane).unwrap();
        let entry = PieceKind::Start.lane_anchors(lane).entry;
        assert!((route.points()[0] - entry).length() < 1e-5);
    }
}

#[test]
fn test_four_rotations_restore_piece_and_links() {
    let mut grid = default_grid();
    let tile = grid.tile_at(1, 3).unwrap();
    let id = piece_at(&grid, 1, 3);
    let before = grid.piece(id).unwrap().clone();

    grid.rotate(tile);
    assert!(grid.piece(id).unwrap().connections.is_empty());
    let start = grid.start_pieces()[0];
    assert!(grid.route(start, Lane::Left).unwrap().is_empty());

    for _ in 0..3 {
        grid.rotate(tile);
    }
    let after = grid.piece(id).unwrap();
    assert_eq!(after.rotation, before.rotation);
    assert_eq!(after.connections, before.connections);
    assert!(connectivity::is_reciprocal(&grid));
    assert!(grid.route(start, Lane::Left).unwrap().is_closed());
}

#[test]
fn test_removing_piece_detaches_neighbours() {
    let mut grid = default_grid();
    let start = piece_at(&grid, 1, 4);
    let next = piece_at(&grid, 1, 2);

    let removed = grid.remove(grid.tile_at(1, 3).unwrap()).unwrap();
    assert_eq!(removed.kind, PieceKind::Straight);
    assert_eq!(grid.piece(start).unwrap().connections.end, None);
    assert_eq!(grid.piece(next).unwrap().connections.start, None);
    assert!(connectivity::is_reciprocal(&grid));
    assert!(grid.route(start, Lane::Right).unwrap().is_empty());

    grid.place(grid.tile_at(1, 3).unwrap(), PieceKind::Straight);
    assert!(grid.pieces().all(|(_, p)| p.connections.is_complete()));
    assert!(grid.route(start, Lane::Right).unwrap().is_closed());
}

#[test]
fn test_layout_files_round_trip() {
    let layout = TrackLayout::default_loop();

    let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    write!(yaml, "{}", serde_yaml::to_string(&layout).unwrap()).unwrap();
    let from_yaml = LayoutLoader::load_from_file(yaml.path()).unwrap();
    assert_eq!(from_yaml, layout);

    let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(json, "{}", serde_json::to_string_pretty(&layout).unwrap()).unwrap();
    let from_json = LayoutLoader::load_from_file(json.path()).unwrap();
    assert_eq!(from_json, layout);

    let grid = from_json.build(TrackSettings::default()).unwrap();
    assert!(grid.pieces().all(|(_, p)| p.connections.is_complete()));
}

#[test]
fn test_missing_layout_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = LayoutLoader::load_from_file(dir.path().join("none.yaml"));
    assert!(matches!(result, Err(tile_racer::layout::LayoutError::Io(_))));
}

#[test]
fn test_autopilot_race_makes_progress() {
    let mut config = SimConfig::default();
    config.simulation.seed = Some(2024);
    let mut session = RaceSession::new(
        &config,
        Box::new(TracingScoreboard::new()),
        Box::new(NullAssetLoader),
    );
    session.load_layout(&TrackLayout::default_loop()).unwrap();

    let tile = session.grid().tile_at(1, 4).unwrap();
    session.spawn_car(tile).unwrap();
    session.spawn_car(tile).unwrap();

    let mut ctx = SimContext::default();
    assert!(session.start_race(&mut ctx, 1));

    let mut rng = StdRng::seed_from_u64(1);
    let mut autopilot = Autopilot::new(1.0);
    let dt = config.tick_seconds();
    for _ in 0..(20 * 60) {
        let keys: Vec<char> = session.cars().iter().map(|c| c.button).collect();
        autopilot.roll(keys, &mut rng);
        session.tick(&mut ctx, &autopilot, dt);
    }

    assert_eq!(ctx.mode, AppMode::Racing);
    for car in session.cars() {
        assert!(car.laps > 0 || car.distance_on_track > 0.0);
        assert!(car.distance_on_track >= 0.0);
        assert!(car.velocity >= 0.0 && car.velocity <= car.max_velocity + 3.0);
        if car.place.is_some() {
            assert!(car.laps >= 1);
        }
    }
    assert!(connectivity::is_reciprocal(session.grid()));
}
