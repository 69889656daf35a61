//! # Marker Feedback
//!
//! Applies operator edits reported by the marker renderer to the waypoint store.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::eqpt::marker::{FeedbackEventType, InteractiveMarkerFeedback};
use log::{debug, info, warn};

use crate::{
    loc::Pose,
    marker_server::MarkerServer,
    store::{WaypointId, WaypointStore},
};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// What was done with a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    /// The waypoint's pose was overwritten
    PoseUpdated(WaypointId),

    /// The event kind carries no edit
    Ignored,

    /// The marker name is not the ID of a known waypoint
    UnknownMarker,

    /// The reported pose could not be used
    InvalidPose,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Handle a single feedback event.
///
/// On a pose update the waypoint named by the marker is moved to the reported pose, and the pose
/// is mirrored into the marker server. Every other event is only logged. Changes are applied on
/// the server whatever the event.
pub fn on_feedback<S: MarkerServer>(
    store: &mut WaypointStore,
    server: &mut S,
    feedback: &InteractiveMarkerFeedback
) -> Result<FeedbackOutcome, S::Error> {
    let outcome = match feedback.event_type {
        FeedbackEventType::PoseUpdate => apply_pose_update(store, server, feedback)?,
        other => {
            debug!(
                "Feedback from marker '{}' / control '{}': {:?}",
                feedback.marker_name, feedback.control_name, other
            );
            FeedbackOutcome::Ignored
        }
    };

    server.apply_changes()?;

    Ok(outcome)
}

fn apply_pose_update<S: MarkerServer>(
    store: &mut WaypointStore,
    server: &mut S,
    feedback: &InteractiveMarkerFeedback
) -> Result<FeedbackOutcome, S::Error> {
    let id = match feedback.marker_name.parse::<WaypointId>() {
        Ok(id) if store.get(id).is_some() => id,
        _ => {
            warn!(
                "Feedback for marker '{}' which is not a known waypoint, ignoring",
                feedback.marker_name
            );
            return Ok(FeedbackOutcome::UnknownMarker)
        }
    };

    let pose = match Pose::try_from(&feedback.pose) {
        Ok(p) => p,
        Err(e) => {
            warn!("Pose feedback for waypoint {} is invalid, ignoring: {}", id, e);
            return Ok(FeedbackOutcome::InvalidPose)
        }
    };

    info!(
        "Feedback from marker '{}' / control '{}': pose changed\n\
        new position = {}\n\
        new orientation = {}\n\
        frame: {} time: {}",
        feedback.marker_name, feedback.control_name,
        feedback.pose.position,
        feedback.pose.orientation,
        feedback.header.frame_id, feedback.header.timestamp
    );

    store.set_pose(id, pose);
    server.set_pose(&feedback.marker_name, feedback.pose)?;

    Ok(FeedbackOutcome::PoseUpdated(id))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::marker_server::MarkerRegistry;
    use comms_if::eqpt::geom::{Header, PoseMsg, Quaternion};

    fn feedback(name: &str, event_type: FeedbackEventType, pose: PoseMsg) -> InteractiveMarkerFeedback {
        InteractiveMarkerFeedback {
            header: Header::now("map"),
            client_id: "ui".into(),
            marker_name: name.into(),
            control_name: String::new(),
            event_type,
            pose,
        }
    }

    fn setup() -> (WaypointStore, MarkerRegistry) {
        let mut store = WaypointStore::new();
        let mut server = MarkerRegistry::new("cube");
        store.create_waypoint(Pose::default(), &mut server).unwrap();
        store.create_waypoint(Pose::from_xy_yaw(3.0, 0.0, 0.0), &mut server).unwrap();
        (store, server)
    }

    #[test]
    fn test_pose_update_last_write_wins() {
        let (mut store, mut server) = setup();
        let first = Pose::from_xy_yaw(1.0, 1.0, 0.2);
        let second = Pose::from_xy_yaw(5.0, -2.0, -0.4);

        let out = on_feedback(
            &mut store, &mut server,
            &feedback("1", FeedbackEventType::PoseUpdate, first.to_msg())
        ).unwrap();
        assert_eq!(out, FeedbackOutcome::PoseUpdated(WaypointId(1)));

        // Repeated delivery is harmless
        for _ in 0..2 {
            on_feedback(
                &mut store, &mut server,
                &feedback("1", FeedbackEventType::PoseUpdate, second.to_msg())
            ).unwrap();
        }

        let stored = store.get(WaypointId(1)).unwrap().pose;
        assert_eq!(stored.position_m, second.position_m);
        assert!((stored.get_heading() - second.get_heading()).abs() < 1e-12);
        assert_eq!(server.get("1").unwrap().pose, second.to_msg());
        assert!(!server.has_pending());

        // Other waypoint untouched
        assert_eq!(store.get(WaypointId(0)).unwrap().pose, Pose::default());
    }

    #[test]
    fn test_other_events_do_not_mutate() {
        let (mut store, mut server) = setup();
        let moved = Pose::from_xy_yaw(9.0, 9.0, 0.0);

        for event in &[
            FeedbackEventType::KeepAlive,
            FeedbackEventType::MouseDown,
            FeedbackEventType::MouseUp,
            FeedbackEventType::ButtonClick,
        ] {
            let out = on_feedback(&mut store, &mut server, &feedback("0", *event, moved.to_msg()))
                .unwrap();
            assert_eq!(out, FeedbackOutcome::Ignored);
        }

        assert_eq!(store.get(WaypointId(0)).unwrap().pose, Pose::default());
    }

    #[test]
    fn test_unknown_and_invalid() {
        let (mut store, mut server) = setup();
        let moved = Pose::from_xy_yaw(9.0, 9.0, 0.0).to_msg();

        for name in &["7", "", "abc"] {
            let out = on_feedback(
                &mut store, &mut server,
                &feedback(name, FeedbackEventType::PoseUpdate, moved)
            ).unwrap();
            assert_eq!(out, FeedbackOutcome::UnknownMarker);
        }
        assert_eq!(store.len(), 2);

        let mut bad = moved;
        bad.orientation = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
        let out = on_feedback(
            &mut store, &mut server,
            &feedback("0", FeedbackEventType::PoseUpdate, bad)
        ).unwrap();
        assert_eq!(out, FeedbackOutcome::InvalidPose);
        assert_eq!(store.get(WaypointId(0)).unwrap().pose, Pose::default());
    }
}
