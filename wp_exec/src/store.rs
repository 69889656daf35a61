//! # Waypoint Store
//!
//! Owns every waypoint created during a session and assigns their IDs. Each new waypoint is also
//! registered with the marker server as an interactive marker named by its ID, so that an operator
//! can drag or rotate it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{collections::BTreeMap, fmt, num::ParseIntError, str::FromStr};

use comms_if::eqpt::{
    geom::{Header, PoseMsg, Vector3},
    marker::{
        Color, InteractionMode, InteractiveMarker, InteractiveMarkerControl, Marker, MarkerType,
        OrientationMode,
    },
};
use log::{info, warn};

use crate::{loc::Pose, marker_server::MarkerServer};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Frame in which waypoint markers are expressed.
pub const WAYPOINT_FRAME_ID: &str = "map";

/// Edge length of the waypoint cube, and the scale of the interactive marker.
pub const WAYPOINT_MARKER_SCALE: f32 = 1.0;

/// Colour of a newly created waypoint marker.
pub const WAYPOINT_MARKER_COLOR: Color = Color {
    r: 0.05,
    g: 0.80,
    b: 0.02,
    a: 1.0,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Identifier of a waypoint.
///
/// The decimal string form is also the name of the waypoint's interactive marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaypointId(pub u64);

/// A navigation target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub id: WaypointId,

    pub pose: Pose,

    /// True if the waypoint marks an area to be searched rather than a point to pass through.
    pub is_search_area: bool,
}

/// Collection of all waypoints, keyed and ordered by ID.
#[derive(Debug, Default)]
pub struct WaypointStore {
    waypoints: BTreeMap<WaypointId, Waypoint>,

    next_id: WaypointId,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WaypointId {
    /// The ID following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WaypointId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new waypoint at the given pose and register its marker with the server.
    ///
    /// If the server rejects the marker no waypoint is created and the ID is not consumed. Once the
    /// marker is accepted the waypoint exists: a failure to apply the change is logged and the
    /// marker goes out with the next successful update.
    pub fn create_waypoint<S: MarkerServer>(
        &mut self,
        pose: Pose,
        server: &mut S
    ) -> Result<WaypointId, S::Error> {
        let id = self.next_id;

        server.insert(make_waypoint_marker(id, &pose))?;

        self.waypoints.insert(id, Waypoint {
            id,
            pose,
            is_search_area: false,
        });
        self.next_id = id.next();

        info!(
            "Created waypoint {} at ({:.3}, {:.3})",
            id, pose.position_m.x, pose.position_m.y
        );

        if let Err(e) = server.apply_changes() {
            warn!("Could not publish waypoint {}: {}", id, e);
        }

        Ok(id)
    }

    pub fn get(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(&id)
    }

    /// Overwrite the pose of an existing waypoint.
    ///
    /// Returns `false` if there is no waypoint with this ID.
    pub(crate) fn set_pose(&mut self, id: WaypointId, pose: Pose) -> bool {
        match self.waypoints.get_mut(&id) {
            Some(wp) => {
                wp.pose = pose;
                true
            },
            None => false
        }
    }

    /// Iterate over the waypoints in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.values()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// The ID that will be given to the next waypoint.
    pub fn next_id(&self) -> WaypointId {
        self.next_id
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the interactive marker representing a waypoint.
///
/// A green cube which can be moved and rotated by the operator, and is always visible.
pub fn make_waypoint_marker(id: WaypointId, pose: &Pose) -> InteractiveMarker {
    let pose_msg: PoseMsg = pose.to_msg();

    let cube = Marker {
        header: Header::now(WAYPOINT_FRAME_ID),
        ns: String::new(),
        id: 0,
        marker_type: MarkerType::Cube,
        pose: PoseMsg::default(),
        scale: Vector3::uniform(WAYPOINT_MARKER_SCALE as f64),
        color: WAYPOINT_MARKER_COLOR,
    };

    let control = InteractiveMarkerControl {
        name: String::new(),
        orientation_mode: OrientationMode::ViewFacing,
        interaction_mode: InteractionMode::MoveRotate,
        always_visible: true,
        independent_marker_orientation: true,
        markers: vec![cube],
    };

    InteractiveMarker {
        header: Header::now(WAYPOINT_FRAME_ID),
        name: id.to_string(),
        description: String::new(),
        pose: pose_msg,
        scale: WAYPOINT_MARKER_SCALE,
        controls: vec![control],
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::marker_server::MarkerRegistry;
    use std::io;

    #[test]
    fn test_id_string_round_trip() {
        for raw in &[0u64, 7, 10, 123_456_789] {
            let id = WaypointId(*raw);
            assert_eq!(id.to_string().parse::<WaypointId>(), Ok(id));
        }

        assert!("".parse::<WaypointId>().is_err());
        assert!("-1".parse::<WaypointId>().is_err());
        assert!("wp3".parse::<WaypointId>().is_err());
    }

    #[test]
    fn test_ids_sequential() {
        let mut store = WaypointStore::new();
        let mut server = MarkerRegistry::new("cube");

        for i in 0..5 {
            let id = store
                .create_waypoint(Pose::from_xy_yaw(i as f64, 0.0, 0.0), &mut server)
                .unwrap();
            assert_eq!(id, WaypointId(i));
        }

        assert_eq!(store.len(), 5);
        assert_eq!(store.next_id(), WaypointId(5));
        assert_eq!(
            store.iter().map(|wp| wp.id.0).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );
        assert!(store.iter().all(|wp| !wp.is_search_area));
    }

    #[test]
    fn test_create_registers_marker() {
        let mut store = WaypointStore::new();
        let mut server = MarkerRegistry::new("cube");
        let pose = Pose::from_xy_yaw(1.0, 2.0, 0.3);

        let id = store.create_waypoint(pose, &mut server).unwrap();

        // Changes were applied, so the marker is committed
        assert!(!server.has_pending());
        let marker = server.get("0").unwrap();
        assert_eq!(marker.name, id.to_string());
        assert_eq!(marker.header.frame_id, "map");
        assert_eq!(marker.pose, pose.to_msg());
        assert_eq!(marker.controls.len(), 1);

        let control = &marker.controls[0];
        assert!(control.always_visible);
        assert!(control.independent_marker_orientation);
        assert_eq!(control.orientation_mode, OrientationMode::ViewFacing);
        assert_eq!(control.interaction_mode, InteractionMode::MoveRotate);

        let cube = &control.markers[0];
        assert_eq!(cube.marker_type, MarkerType::Cube);
        assert_eq!(cube.color, WAYPOINT_MARKER_COLOR);
        assert_eq!(cube.scale, Vector3::uniform(1.0));
    }

    /// Server which accepts markers but never manages to publish them.
    struct UnpublishableServer {
        inner: MarkerRegistry,
        reject_insert: bool,
    }

    impl UnpublishableServer {
        fn new(reject_insert: bool) -> Self {
            Self {
                inner: MarkerRegistry::new("cube"),
                reject_insert,
            }
        }
    }

    impl MarkerServer for UnpublishableServer {
        type Error = io::Error;

        fn insert(&mut self, marker: InteractiveMarker) -> Result<(), Self::Error> {
            if self.reject_insert {
                return Err(io::Error::new(io::ErrorKind::Other, "insert rejected"))
            }
            self.inner.insert(marker);
            Ok(())
        }

        fn set_pose(&mut self, name: &str, pose: PoseMsg) -> Result<bool, Self::Error> {
            Ok(self.inner.set_pose(name, pose))
        }

        fn apply_changes(&mut self) -> Result<(), Self::Error> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "publisher gone"))
        }
    }

    #[test]
    fn test_publish_failure_keeps_waypoint() {
        let mut store = WaypointStore::new();
        let mut server = UnpublishableServer::new(false);

        let id = store.create_waypoint(Pose::default(), &mut server).unwrap();

        assert_eq!(id, WaypointId(0));
        assert!(store.get(id).is_some());
        assert_eq!(store.next_id(), WaypointId(1));
        assert!(server.inner.has_pending());
    }

    #[test]
    fn test_rejected_marker_consumes_nothing() {
        let mut store = WaypointStore::new();
        let mut server = UnpublishableServer::new(true);

        assert!(store.create_waypoint(Pose::default(), &mut server).is_err());
        assert!(store.is_empty());
        assert_eq!(store.next_id(), WaypointId(0));
    }

    #[test]
    fn test_set_pose() {
        let mut store = WaypointStore::new();
        let mut server = MarkerRegistry::new("cube");
        let id = store
            .create_waypoint(Pose::default(), &mut server)
            .unwrap();

        let moved = Pose::from_xy_yaw(4.0, 4.0, 1.0);
        assert!(store.set_pose(id, moved));
        assert_eq!(store.get(id).unwrap().pose, moved);

        assert!(!store.set_pose(WaypointId(9), moved));
        assert_eq!(store.len(), 1);
    }
}
