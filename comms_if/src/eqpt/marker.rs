//! # Interactive Marker Communications Module
//!
//! Messages exchanged with the interactive marker renderer. The renderer displays markers, lets an
//! operator drag and rotate them, and reports those edits back as feedback. The marker server
//! publishes incremental updates and periodic full snapshots of every marker it holds.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::geom::{Header, PoseMsg, Vector3};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// RGBA colour, nominally each channel in `[0, 1]`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// A visual primitive.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Marker {
    pub header: Header,

    /// Namespace, together with `id` identifies the marker
    #[serde(default)]
    pub ns: String,

    #[serde(default)]
    pub id: i32,

    pub marker_type: MarkerType,

    /// Pose relative to the parent (the interactive marker if any)
    #[serde(default)]
    pub pose: PoseMsg,

    /// Size along each axis. For spheres and cylinders `scale.x` is the diameter.
    pub scale: Vector3,

    pub color: Color,
}

/// A collection of markers sent as one message.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct MarkerArray {
    pub markers: Vec<Marker>,
}

/// One way of interacting with an interactive marker, plus the visuals drawn for it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractiveMarkerControl {
    pub name: String,

    pub orientation_mode: OrientationMode,

    pub interaction_mode: InteractionMode,

    /// Draw the control even when the renderer is not in interaction mode
    pub always_visible: bool,

    /// Keep the visual markers' orientation when the control is rotated
    pub independent_marker_orientation: bool,

    pub markers: Vec<Marker>,
}

/// A marker which the operator can manipulate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractiveMarker {
    pub header: Header,

    /// Unique name of the marker on its server
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub pose: PoseMsg,

    /// Size of the default control handles
    pub scale: f32,

    pub controls: Vec<InteractiveMarkerControl>,
}

/// A pose change for a marker the receiver already knows about.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractiveMarkerPose {
    pub header: Header,
    pub name: String,
    pub pose: PoseMsg,
}

/// An operator interaction reported by the renderer.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractiveMarkerFeedback {
    pub header: Header,

    /// Identifies the renderer instance which sent the feedback
    #[serde(default)]
    pub client_id: String,

    pub marker_name: String,

    #[serde(default)]
    pub control_name: String,

    pub event_type: FeedbackEventType,

    /// The marker's pose after the interaction
    pub pose: PoseMsg,
}

/// Incremental changes published by a marker server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractiveMarkerUpdate {
    pub server_id: String,

    pub seq_num: u64,

    /// Markers which are new or whose definition changed
    pub markers: Vec<InteractiveMarker>,

    /// Markers whose pose changed
    pub poses: Vec<InteractiveMarkerPose>,

    /// Markers which were removed
    #[serde(default)]
    pub erases: Vec<String>,
}

/// Every marker currently held by a marker server.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InteractiveMarkerInit {
    pub server_id: String,

    /// Sequence number of the last update included in this snapshot
    pub seq_num: u64,

    pub markers: Vec<InteractiveMarker>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Shape of a [`Marker`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum MarkerType {
    Arrow,
    Cube,
    Sphere,
    Cylinder,
    TextViewFacing,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum OrientationMode {
    /// Follow the parent interactive marker
    Inherit,
    /// Stay fixed in the header frame
    Fixed,
    /// Always face the viewer
    ViewFacing,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    None,
    Menu,
    Button,
    MoveAxis,
    MovePlane,
    RotateAxis,
    MoveRotate,
    Move3d,
    Rotate3d,
    MoveRotate3d,
}

/// Kind of interaction reported in an [`InteractiveMarkerFeedback`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackEventType {
    KeepAlive,
    PoseUpdate,
    MenuSelect,
    ButtonClick,
    MouseDown,
    MouseUp,
}

/// Messages published on the marker server endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum MarkerServerMsg {
    Update(InteractiveMarkerUpdate),
    UpdateFull(InteractiveMarkerInit),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InteractiveMarker {
    /// Get the `marker_idx`th visual of the `control_idx`th control, if both exist.
    pub fn control_marker(&self, control_idx: usize, marker_idx: usize) -> Option<&Marker> {
        self.controls
            .get(control_idx)
            .and_then(|c| c.markers.get(marker_idx))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn marker_with_red(r: f32) -> Marker {
        Marker {
            header: Header::now("map"),
            ns: String::new(),
            id: 0,
            marker_type: MarkerType::Sphere,
            pose: PoseMsg::default(),
            scale: Vector3::uniform(1.0),
            color: Color { r, g: 0.0, b: 0.0, a: 1.0 },
        }
    }

    #[test]
    fn test_control_marker() {
        let mut int_marker = InteractiveMarker {
            header: Header::now("map"),
            name: "0".into(),
            description: String::new(),
            pose: PoseMsg::default(),
            scale: 1.0,
            controls: vec![],
        };

        assert!(int_marker.control_marker(0, 0).is_none());

        int_marker.controls.push(InteractiveMarkerControl {
            name: String::new(),
            orientation_mode: OrientationMode::Inherit,
            interaction_mode: InteractionMode::None,
            always_visible: false,
            independent_marker_orientation: false,
            markers: vec![marker_with_red(0.5), marker_with_red(2.0)],
        });

        assert_eq!(int_marker.control_marker(0, 1).map(|m| m.color.r), Some(2.0));
        assert!(int_marker.control_marker(0, 2).is_none());
        assert!(int_marker.control_marker(1, 0).is_none());
    }

    #[test]
    fn test_server_msg_json() {
        let msg = MarkerServerMsg::UpdateFull(InteractiveMarkerInit {
            server_id: "cube".into(),
            seq_num: 3,
            markers: vec![],
        });

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.starts_with("{\"UpdateFull\":"));

        let back: MarkerServerMsg = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
