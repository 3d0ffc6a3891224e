use crate::car::Car;
use crate::data::{CarId, HslColor};
use std::collections::HashMap;
use tracing::{debug, info};

/// One car's row on the scoreboard.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreLine {
    pub button: char,
    /// Displayed speed (`velocity / 1000`).
    pub speed: f32,
    pub lap: u32,
    pub color: HslColor,
    pub place: Option<String>,
}

impl ScoreLine {
    pub fn from_car(car: &Car) -> Self {
        Self {
            button: car.button,
            speed: car.velocity / 1000.0,
            lap: car.laps,
            color: car.color,
            place: car.place.clone(),
        }
    }
}

pub trait Scoreboard {
    fn create(&mut self, car: &Car);
    fn update(&mut self, id: CarId, line: &ScoreLine);
    fn remove(&mut self, id: CarId);
}

/// Keeps the latest line per car and logs lap and place changes.
#[derive(Debug, Default)]
pub struct TracingScoreboard {
    lines: HashMap<CarId, ScoreLine>,
}

impl TracingScoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self, id: CarId) -> Option<&ScoreLine> {
        self.lines.get(&id)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Scoreboard for TracingScoreboard {
    fn create(&mut self, car: &Car) {
        debug!("Scoreboard line for car {} ({})", car.button, car.color);
        self.lines.insert(car.id, ScoreLine::from_car(car));
    }

    fn update(&mut self, id: CarId, line: &ScoreLine) {
        let Some(current) = self.lines.get_mut(&id) else {
            return;
        };
        if line.lap != current.lap && line.lap > 0 {
            info!("[{}] lap {} at speed {:.3}", line.button, line.lap, line.speed);
        }
        if line.place != current.place {
            if let Some(place) = &line.place {
                info!("[{}] place {}", line.button, place);
            }
        }
        *current = line.clone();
    }

    fn remove(&mut self, id: CarId) {
        if let Some(line) = self.lines.remove(&id) {
            debug!("Scoreboard line for car {} removed", line.button);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CarSettings;
    use crate::data::{Lane, PieceId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn create_test_car() -> Car {
        let mut rng = StdRng::seed_from_u64(1);
        Car::new(PieceId(0), Lane::Right, 'Q', CarSettings::default(), &mut rng)
    }

    #[test]
    fn test_line_tracks_updates() {
        let mut board = TracingScoreboard::new();
        let mut car = create_test_car();
        board.create(&car);
        assert_eq!(board.line(car.id).unwrap().lap, 0);

        car.velocity = 520.0;
        car.laps = 2;
        car.place = Some("1st".to_string());
        board.update(car.id, &ScoreLine::from_car(&car));

        let line = board.line(car.id).unwrap();
        assert_eq!(line.lap, 2);
        assert!((line.speed - 0.52).abs() < 1e-6);
        assert_eq!(line.place.as_deref(), Some("1st"));
    }

    #[test]
    fn test_update_for_unknown_car_is_ignored() {
        let mut board = TracingScoreboard::new();
        let car = create_test_car();
        board.update(car.id, &ScoreLine::from_car(&car));
        assert!(board.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut board = TracingScoreboard::new();
        let car = create_test_car();
        board.create(&car);
        board.remove(car.id);
        assert!(board.line(car.id).is_none());
        assert_eq!(board.len(), 0);
    }
}
