//! # Waypoint Generator
//!
//! Samples waypoints from the localisation pose stream and applies operator edits to them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::eqpt::{marker::InteractiveMarkerFeedback, perloc::LocPose};
use log::{trace, warn};

use crate::{
    feedback::{self, FeedbackOutcome},
    gate::{GateThresholds, PoseDeltaGate},
    loc::Pose,
    marker_server::MarkerServer,
    store::{WaypointId, WaypointStore},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Owns the gate and the store, and routes the incoming streams to them.
#[derive(Debug)]
pub struct WaypointGenerator {
    gate: PoseDeltaGate,

    store: WaypointStore,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WaypointGenerator {
    pub fn new(thresholds: GateThresholds) -> Self {
        Self {
            gate: PoseDeltaGate::new(thresholds),
            store: WaypointStore::new(),
        }
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn gate(&self) -> &PoseDeltaGate {
        &self.gate
    }

    /// Handle a new localisation pose.
    ///
    /// Returns the ID of the waypoint created, if the pose passed the gate. Fails only if the
    /// server rejects the new marker, in which case the gate is left untouched.
    pub fn on_pose<S: MarkerServer>(
        &mut self,
        loc_pose: &LocPose,
        server: &mut S
    ) -> Result<Option<WaypointId>, S::Error> {
        let pose = match Pose::try_from(&loc_pose.pose) {
            Ok(p) => p,
            Err(e) => {
                warn!("Discarding localisation pose: {}", e);
                return Ok(None)
            }
        };

        if !self.gate.should_emit(&pose) {
            trace!("Pose within thresholds of the last waypoint");
            return Ok(None)
        }

        let id = self.store.create_waypoint(pose, server)?;
        self.gate.accept(pose);

        Ok(Some(id))
    }

    /// Handle operator feedback on a waypoint marker.
    pub fn on_feedback<S: MarkerServer>(
        &mut self,
        fb: &InteractiveMarkerFeedback,
        server: &mut S
    ) -> Result<FeedbackOutcome, S::Error> {
        feedback::on_feedback(&mut self.store, server, fb)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::marker_server::MarkerRegistry;
    use comms_if::eqpt::{
        geom::{Header, PoseMsg, Quaternion},
        marker::InteractiveMarker,
    };
    use std::io;

    /// Server whose publish step always fails.
    struct OfflineServer(MarkerRegistry);

    impl MarkerServer for OfflineServer {
        type Error = io::Error;

        fn insert(&mut self, marker: InteractiveMarker) -> Result<(), Self::Error> {
            self.0.insert(marker);
            Ok(())
        }

        fn set_pose(&mut self, name: &str, pose: PoseMsg) -> Result<bool, Self::Error> {
            Ok(self.0.set_pose(name, pose))
        }

        fn apply_changes(&mut self) -> Result<(), Self::Error> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "publisher gone"))
        }
    }

    fn loc_pose(pose: Pose) -> LocPose {
        LocPose {
            header: Header::now("map"),
            pose: pose.to_msg(),
            covariance: vec![],
        }
    }

    #[test]
    fn test_first_pose_creates_waypoint() {
        let mut gen = WaypointGenerator::new(GateThresholds::default());
        let mut server = MarkerRegistry::new("cube");

        // Within both thresholds of the origin, only the startup rule accepts it
        let id = gen.on_pose(&loc_pose(Pose::from_xy_yaw(0.5, 0.5, 0.1)), &mut server).unwrap();

        assert_eq!(id, Some(WaypointId(0)));
        assert_eq!(server.len(), 1);
    }

    #[test]
    fn test_default_scenario() {
        let mut gen = WaypointGenerator::new(GateThresholds::default());
        let mut server = MarkerRegistry::new("cube");

        let ids = [(0.0, 0.0), (1.0, 0.0), (3.0, 0.0)]
            .iter()
            .map(|(x, y)| gen.on_pose(&loc_pose(Pose::from_xy_yaw(*x, *y, 0.0)), &mut server).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(ids, vec![Some(WaypointId(0)), None, Some(WaypointId(1))]);
        assert_eq!(gen.store().get(WaypointId(1)).unwrap().pose.position_m.x, 3.0);
    }

    #[test]
    fn test_bad_pose_discarded() {
        let mut gen = WaypointGenerator::new(GateThresholds::default());
        let mut server = MarkerRegistry::new("cube");

        let mut msg = loc_pose(Pose::default());
        msg.pose.orientation = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };

        assert_eq!(gen.on_pose(&msg, &mut server).unwrap(), None);
        assert!(gen.store().is_empty());
        assert!(gen.gate().last_accepted().is_none());
    }

    #[test]
    fn test_gate_advances_when_publish_fails() {
        let mut gen = WaypointGenerator::new(GateThresholds::default());
        let mut server = OfflineServer(MarkerRegistry::new("cube"));

        for x in &[0.0, 0.1, 0.2] {
            gen.on_pose(&loc_pose(Pose::from_xy_yaw(*x, 0.0, 0.0)), &mut server).unwrap();
        }

        assert_eq!(gen.store().len(), 1);
        assert_eq!(gen.gate().last_accepted().unwrap().position_m.x, 0.0);
        assert!(server.0.has_pending());
    }
}
