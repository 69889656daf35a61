//! # Geometry Message Types
//!
//! Plain serialisable geometry shared by the localisation and marker messages. These follow the
//! layout of the ROS `geometry_msgs`/`std_msgs` types so that bridges to a ROS graph stay
//! one-to-one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt;

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position of a point in free space.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A vector in free space, used for marker scales.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// An orientation in quaternion form.
///
/// Nothing forces this to be normalised on the wire, receivers must check.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

/// Position and orientation in free space.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct PoseMsg {
    pub position: Point,
    pub orientation: Quaternion,
}

/// Frame and timestamp information attached to stamped messages.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Header {
    /// Name of the frame the message data is expressed in
    pub frame_id: String,

    /// UTC timestamp of the data
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for Quaternion {
    /// The identity rotation.
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

impl fmt::Display for Quaternion {
    /// Components in `x, y, z, w` order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.x, self.y, self.z, self.w)
    }
}

impl Header {
    /// Create a header in the given frame stamped with the current time.
    pub fn now(frame_id: &str) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}

impl Vector3 {
    /// A vector with all three components set to `v`.
    pub fn uniform(v: f64) -> Self {
        Self { x: v, y: v, z: v }
    }
}
