//! Tunables for the autopilot, loaded from JSON at startup.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::utils::pid::PidGains;

/// Default file name for the autopilot configuration.
const CONFIG_FILE_NAME: &str = "autopilot.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Flight, docking and avoidance parameters shared by every controller.
///
/// Times are in seconds and distances in world units; countdowns are
/// converted to whole ticks with [`AutopilotConfig::ticks`].
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Fixed simulation rate.
    pub tick_rate: u32,
    /// Seed for the sector RNG.
    pub seed: u64,

    // Docking
    pub dock_approach_timeout_secs: f32,
    pub docking_retry_secs: f32,
    /// Maximum craft queued plus approaching at one small-craft dock.
    pub dock_queue_capacity: usize,
    pub auto_undock_delay_secs: f32,
    pub undock_maneuver_secs: f32,
    pub undock_throttle: f32,
    /// Distance from the last lane waypoint that counts as physical contact.
    pub contact_radius: f32,
    /// Beyond this distance a docking craft never waits and cruises boosted.
    pub supercruise_range: f32,
    pub supercruise_throttle: f32,
    pub throttle_floor: f32,
    pub waypoint_reached_distance: f32,
    pub facing_tolerance_deg: f32,

    // Avoidance
    pub probe_length: f32,
    pub throttle_deadband: f32,
    pub avoidance_arrival_distance: f32,
    pub avoidance_heading_tolerance_deg: f32,
    pub avoidance_throttle: f32,

    // Single-state orders
    pub arrival_distance: f32,
    pub engage_range: f32,
    pub scanner_range: f32,
    pub follow_distance: f32,
    pub idle_radius: f32,
    pub idle_throttle: f32,

    // Steering
    pub heading_gains: PidGains,
    pub damping_gains: PidGains,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            seed: 0x5EED,

            dock_approach_timeout_secs: 60.0,
            docking_retry_secs: 3.0,
            dock_queue_capacity: 8,
            auto_undock_delay_secs: 2.0,
            undock_maneuver_secs: 5.0,
            undock_throttle: 0.6,
            contact_radius: 25.0,
            supercruise_range: 700.0,
            supercruise_throttle: 2.0,
            throttle_floor: 0.1,
            waypoint_reached_distance: 20.0,
            facing_tolerance_deg: 7.0,

            probe_length: 400.0,
            throttle_deadband: 0.05,
            avoidance_arrival_distance: 10.0,
            avoidance_heading_tolerance_deg: 10.0,
            avoidance_throttle: 0.5,

            arrival_distance: 20.0,
            engage_range: 300.0,
            scanner_range: 5000.0,
            follow_distance: 150.0,
            idle_radius: 500.0,
            idle_throttle: 0.3,

            heading_gains: PidGains::new(4.0, 0.0, 0.6),
            damping_gains: PidGains::new(1.5, 0.0, 0.0),
        }
    }
}

impl AutopilotConfig {
    /// Length of one simulation step in seconds.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    /// Converts a duration to a whole number of ticks (at least one).
    pub fn ticks(&self, secs: f32) -> u32 {
        ((secs * self.tick_rate as f32).round() as u32).max(1)
    }

    /// Parses a config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Returns the platform-specific path of the user config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push("starlane");
            path.push(CONFIG_FILE_NAME);
            path
        })
    }

    /// Loads the config from `explicit` if given, else from the user config
    /// directory, falling back to defaults when nothing usable is found.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => {
                    info!("No autopilot config found, using defaults");
                    return Self::default();
                }
            },
        };

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded autopilot config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring autopilot config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_is_180_ticks() {
        let config = AutopilotConfig::default();
        assert_eq!(config.ticks(config.docking_retry_secs), 180);
        assert_eq!(config.ticks(config.dock_approach_timeout_secs), 3600);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AutopilotConfig =
            serde_json::from_str(r#"{ "tick_rate": 30, "dock_queue_capacity": 2 }"#).unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.dock_queue_capacity, 2);
        assert_eq!(config.ticks(config.docking_retry_secs), 90);
        assert!((config.supercruise_range - 700.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = AutopilotConfig::from_file(Path::new("/nonexistent/autopilot.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
