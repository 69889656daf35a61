//! # Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::gate::{GateThresholds, DEFAULT_DIST_THRESH_M, DEFAULT_YAW_THRESH_RAD};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the waypoint generator, loaded from `wp_generator.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorParams {
    /// Minimum log level, as understood by `log::LevelFilter`
    pub log_level: String,

    /// Planar distance the robot must travel before a new waypoint is made.
    ///
    /// Units: meters
    pub dist_thresh_m: f64,

    /// Heading change the robot must make before a new waypoint is made.
    ///
    /// Units: radians
    pub yaw_thresh_rad: f64,

    /// Identifier of the marker server in published updates
    pub server_id: String,

    /// Receive timeout of each subscriber in the dispatch loop
    pub recv_timeout_ms: i32,

    /// Period between publications of the full marker snapshot
    pub full_update_period_s: f64,
}

/// Parameters for the waypoint saver, loaded from `wp_saver.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SaverParams {
    /// Minimum log level, as understood by `log::LevelFilter`
    pub log_level: String,

    /// Directory the waypoint file is written into, relative paths are relative to the working
    /// directory.
    pub output_dir: String,

    /// Receive timeout of each subscriber in the dispatch loop
    pub recv_timeout_ms: i32,

    /// Period between "still waiting" log messages
    pub wait_log_period_s: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl GeneratorParams {
    pub fn thresholds(&self) -> GateThresholds {
        GateThresholds {
            dist_thresh_m: self.dist_thresh_m,
            yaw_thresh_rad: self.yaw_thresh_rad,
        }
    }
}

impl Default for GeneratorParams {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            dist_thresh_m: DEFAULT_DIST_THRESH_M,
            yaw_thresh_rad: DEFAULT_YAW_THRESH_RAD,
            server_id: "cube".into(),
            recv_timeout_ms: 10,
            full_update_period_s: 1.0,
        }
    }
}

impl Default for SaverParams {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
            output_dir: ".".into(),
            recv_timeout_ms: 10,
            wait_log_period_s: 5.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generator_params_defaults() {
        let params: GeneratorParams = util::params::from_str("dist_thresh_m = 1.5").unwrap();

        assert_eq!(params.dist_thresh_m, 1.5);
        assert_eq!(params.yaw_thresh_rad, DEFAULT_YAW_THRESH_RAD);
        assert_eq!(params.thresholds().dist_thresh_m, 1.5);
        assert_eq!(params.server_id, "cube");
    }

    #[test]
    fn test_saver_params_defaults() {
        let params: SaverParams = util::params::from_str("").unwrap();

        assert_eq!(params.output_dir, ".");
        assert_eq!(params.recv_timeout_ms, 10);
    }
}
