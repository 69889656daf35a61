//! # Pose Delta Gate
//!
//! Decides whether a newly observed pose is far enough, in distance or in heading, from the last
//! accepted pose to become a new waypoint.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use util::maths::abs_ang_diff;

use crate::loc::Pose;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Default planar distance threshold.
pub const DEFAULT_DIST_THRESH_M: f64 = 2.0;

/// Default heading threshold, 30 degrees.
pub const DEFAULT_YAW_THRESH_RAD: f64 = std::f64::consts::FRAC_PI_6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Thresholds above which a pose is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GateThresholds {
    /// Planar distance from the last accepted pose.
    ///
    /// Units: meters
    pub dist_thresh_m: f64,

    /// Heading change from the last accepted pose.
    ///
    /// Units: radians
    pub yaw_thresh_rad: f64,
}

/// Stateful gate remembering the last accepted pose.
#[derive(Debug, Clone)]
pub struct PoseDeltaGate {
    thresholds: GateThresholds,

    last_accepted: Option<Pose>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GateThresholds {
    fn default() -> Self {
        Self {
            dist_thresh_m: DEFAULT_DIST_THRESH_M,
            yaw_thresh_rad: DEFAULT_YAW_THRESH_RAD,
        }
    }
}

impl PoseDeltaGate {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self {
            thresholds,
            last_accepted: None,
        }
    }

    pub fn last_accepted(&self) -> Option<&Pose> {
        self.last_accepted.as_ref()
    }

    /// Returns true if `candidate` should become a new waypoint.
    ///
    /// Until a pose has been accepted every candidate passes.
    pub fn should_emit(&self, candidate: &Pose) -> bool {
        match self.last_accepted {
            Some(ref last) => should_emit(last, candidate, &self.thresholds),
            None => true,
        }
    }

    /// Record `pose` as the last accepted pose.
    pub fn accept(&mut self, pose: Pose) {
        self.last_accepted = Some(pose);
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance between two poses on the ground plane, z is ignored.
pub fn planar_dist_m(a: &Pose, b: &Pose) -> f64 {
    (b.position_m.xy() - a.position_m.xy()).norm()
}

/// Absolute heading difference between two poses.
///
/// Not wrapped, headings of `pi - e` and `-pi + e` differ by nearly `2 pi`.
pub fn yaw_diff_rad(a: &Pose, b: &Pose) -> f64 {
    abs_ang_diff(b.get_heading(), a.get_heading())
}

/// Returns true if `candidate` differs from `last` by more than either threshold.
pub fn should_emit(last: &Pose, candidate: &Pose, thresholds: &GateThresholds) -> bool {
    planar_dist_m(last, candidate) > thresholds.dist_thresh_m
        || yaw_diff_rad(last, candidate) > thresholds.yaw_thresh_rad
}
