//! # Perloc Equipment Communications Module
//!
//! Messages published by the localisation (perception-localisation) equipment.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::geom::{Header, PoseMsg};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An estimated pose of the robot with its uncertainty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LocPose {
    pub header: Header,

    /// The estimated pose
    pub pose: PoseMsg,

    /// Row-major 6x6 covariance of (x, y, z, roll, pitch, yaw).
    ///
    /// May be empty if the source does not estimate covariance.
    #[serde(default)]
    pub covariance: Vec<f64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_loc_pose_json() {
        let json = r#"{
            "header": {"frame_id": "map", "timestamp": 1600000000000},
            "pose": {
                "position": {"x": 1.0, "y": 2.0, "z": 0.0},
                "orientation": {"x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0}
            }
        }"#;

        let msg: LocPose = serde_json::from_str(json).unwrap();

        assert_eq!(msg.header.frame_id, "map");
        assert_eq!(msg.pose.position.y, 2.0);
        assert!(msg.covariance.is_empty());
    }
}
