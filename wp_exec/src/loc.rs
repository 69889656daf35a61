//! # Localisation types
//!
//! The pose of the robot as estimated by the localisation source, and conversions to and from the
//! wire representation.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::eqpt::geom::{Point, PoseMsg, Quaternion as QuaternionMsg};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Quaternions with a norm at or below this are rejected as having no orientation.
const MIN_QUATERNION_NORM: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose (position and attitude) in the map frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Pose {

    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude in the map frame.
    pub attitude_q: UnitQuaternion<f64>
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Reasons a wire pose cannot be used.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PoseConversionError {
    #[error("The pose contains a non-finite value")]
    NonFinite,

    #[error("The orientation quaternion has zero norm")]
    DegenerateOrientation,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a pose on the ground plane at `(x, y)` with the given heading.
    pub fn from_xy_yaw(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad),
        }
    }

    /// Return the heading (yaw, angle to the positive X axis) in radians.
    ///
    /// Heading is given in the range [-pi, pi].
    pub fn get_heading(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }

    /// Convert into the wire representation.
    pub fn to_msg(&self) -> PoseMsg {
        let q = &self.attitude_q.coords;

        PoseMsg {
            position: Point {
                x: self.position_m.x,
                y: self.position_m.y,
                z: self.position_m.z,
            },
            orientation: QuaternionMsg {
                x: q.x,
                y: q.y,
                z: q.z,
                w: q.w,
            },
        }
    }
}

impl TryFrom<&PoseMsg> for Pose {
    type Error = PoseConversionError;

    fn try_from(msg: &PoseMsg) -> Result<Self, Self::Error> {
        let p = &msg.position;
        let o = &msg.orientation;

        if ![p.x, p.y, p.z, o.x, o.y, o.z, o.w].iter().all(|v| v.is_finite()) {
            return Err(PoseConversionError::NonFinite)
        }

        // nalgebra takes the scalar part first
        let attitude_q = UnitQuaternion::try_new(
            Quaternion::new(o.w, o.x, o.y, o.z),
            MIN_QUATERNION_NORM
        ).ok_or(PoseConversionError::DegenerateOrientation)?;

        Ok(Self {
            position_m: Vector3::new(p.x, p.y, p.z),
            attitude_q
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_heading() {
        let pose = Pose::from_xy_yaw(1.0, 2.0, FRAC_PI_2);
        assert!((pose.get_heading() - FRAC_PI_2).abs() < 1e-12);
        assert_eq!(pose.position_m, Vector3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_from_msg_normalises() {
        let msg = PoseMsg {
            position: Point { x: 1.0, y: -1.0, z: 0.5 },
            orientation: QuaternionMsg { x: 0.0, y: 0.0, z: 0.0, w: 2.0 },
        };

        let pose = Pose::try_from(&msg).unwrap();

        assert_eq!(pose.position_m, Vector3::new(1.0, -1.0, 0.5));
        assert_eq!(pose.to_msg().orientation, QuaternionMsg::default());
    }

    #[test]
    fn test_from_msg_rejects_bad_orientation() {
        let mut msg = PoseMsg::default();
        msg.orientation = QuaternionMsg { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
        assert_eq!(Pose::try_from(&msg), Err(PoseConversionError::DegenerateOrientation));

        msg.orientation.w = std::f64::NAN;
        assert_eq!(Pose::try_from(&msg), Err(PoseConversionError::NonFinite));
    }

    #[test]
    fn test_msg_round_trip_keeps_yaw() {
        let pose = Pose::from_xy_yaw(3.0, 4.0, -0.75);
        let back = Pose::try_from(&pose.to_msg()).unwrap();

        assert!((back.get_heading() + 0.75).abs() < 1e-12);
        assert_eq!(back.position_m, pose.position_m);
    }
}
