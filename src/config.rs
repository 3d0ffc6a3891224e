use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationSettings,
    pub grid: GridSettings,
    pub track: TrackSettings,
    pub race: RaceSettings,
    pub car: CarSettings,
    pub logging: LoggingSettings,
    pub assets: AssetSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub tick_rate_hz: u16,
    /// Fixed RNG seed; a fresh seed is drawn when absent.
    pub seed: Option<u64>,
    /// Simulated seconds the headless runner keeps racing.
    pub race_seconds: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Per-axis distance under which two lane endpoints count as joined.
    pub connect_tolerance: f32,
    /// Route samples per world unit of curve length.
    pub route_quality: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceSettings {
    pub lap_target: u32,
    pub countdown_seconds: u32,
    /// Finishing place labels, best first.
    pub places: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CarSettings {
    pub acceleration_min: f32,
    pub acceleration_max: f32,
    pub friction_min: f32,
    pub friction_max: f32,
    pub max_velocity_min: f32,
    pub max_velocity_max: f32,
    /// Velocities below this snap to zero while coasting.
    pub stop_epsilon: f32,
    /// How many route samples ahead a car looks when steering.
    pub lookahead_samples: f32,
    pub veer_speed_threshold: f32,
    pub veer_yaw_min_deg: f32,
    pub veer_yaw_max_deg: f32,
    pub veer_duration_secs: f32,
    /// Off-track speed is `velocity / veer_speed_divisor`.
    pub veer_speed_divisor: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit one JSON object per event instead of plain lines.
    pub json: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory holding `models/` and `texture/`; assets are skipped when unset.
    pub root: Option<String>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60,
            seed: None,
            race_seconds: 120.0,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { rows: 10, cols: 7 }
    }
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            connect_tolerance: 0.1,
            route_quality: 100.0,
        }
    }
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            lap_target: 3,
            countdown_seconds: 3,
            places: [
                "1st", "2nd", "3rd", "4th", "5th", "6th", "7th", "8th", "9th", "10th",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for CarSettings {
    fn default() -> Self {
        Self {
            acceleration_min: 100.0,
            acceleration_max: 150.0,
            friction_min: 450.0,
            friction_max: 550.0,
            max_velocity_min: 550.0,
            max_velocity_max: 650.0,
            stop_epsilon: 0.05,
            lookahead_samples: 3.0,
            veer_speed_threshold: 500.0,
            veer_yaw_min_deg: 20.0,
            veer_yaw_max_deg: 70.0,
            veer_duration_secs: 1.0,
            veer_speed_divisor: 100.0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SimConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("{}, using defaults", e);
            Self::default()
        })
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.simulation.tick_rate_hz.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.grid.rows, 10);
        assert_eq!(config.grid.cols, 7);
        assert_eq!(config.race.lap_target, 3);
        assert_eq!(config.race.places.len(), 10);
        assert_eq!(config.track.connect_tolerance, 0.1);
        assert_eq!(config.car.lookahead_samples, 3.0);
    }

    #[test]
    fn test_config_serialization() {
        let config = SimConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("connect_tolerance"));
        assert!(toml_str.contains("lap_target"));

        let parsed: SimConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.car.max_velocity_max, 650.0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[race]\nlap_target = 5\n\n[track]\nroute_quality = 40.0").unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.race.lap_target, 5);
        assert_eq!(config.race.countdown_seconds, 3);
        assert_eq!(config.track.route_quality, 40.0);
        assert_eq!(config.track.connect_tolerance, 0.1);
        assert_eq!(config.simulation.tick_rate_hz, 60);
    }

    #[test]
    fn test_missing_config_falls_back() {
        let config = SimConfig::load_or_default("/nonexistent/tile-racer.toml");
        assert_eq!(config.grid.rows, 10);
        assert!(matches!(
            SimConfig::load("/nonexistent/tile-racer.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
