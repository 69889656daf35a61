//! # Interactive Marker Server
//!
//! The marker server is the single handle through which the rest of the crate talks to the marker
//! renderer. Changes (new markers, pose changes) are queued and only become visible once
//! [`MarkerServer::apply_changes`] is called, at which point an incremental update is published.
//! The full set of markers is republished periodically so that late subscribers (such as the
//! saver) always get a complete snapshot.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;
use std::convert::Infallible;

use comms_if::{
    eqpt::{
        geom::PoseMsg,
        marker::{
            InteractiveMarker, InteractiveMarkerInit, InteractiveMarkerPose,
            InteractiveMarkerUpdate, MarkerServerMsg,
        },
    },
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, trace};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Commands a component may send to the marker renderer.
pub trait MarkerServer {
    type Error: std::error::Error;

    /// Queue a new marker, replacing any marker with the same name.
    fn insert(&mut self, marker: InteractiveMarker) -> Result<(), Self::Error>;

    /// Queue a pose change for an existing marker.
    ///
    /// Returns `false` if no marker with this name exists.
    fn set_pose(&mut self, name: &str, pose: PoseMsg) -> Result<bool, Self::Error>;

    /// Commit all queued changes and notify the renderer.
    fn apply_changes(&mut self) -> Result<(), Self::Error>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// In-memory marker bookkeeping, independent of any transport.
///
/// Holds the committed markers and the changes queued since the last commit.
#[derive(Debug, Clone)]
pub struct MarkerRegistry {
    server_id: String,

    seq_num: u64,

    markers: BTreeMap<String, InteractiveMarker>,

    pending_markers: BTreeMap<String, InteractiveMarker>,

    pending_poses: BTreeMap<String, PoseMsg>,
}

/// Marker server publishing over the network.
pub struct MarkerPublisher {
    registry: MarkerRegistry,

    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MarkerPublisherError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the marker message: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the marker message: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MarkerRegistry {
    pub fn new(server_id: &str) -> Self {
        Self {
            server_id: server_id.to_string(),
            seq_num: 0,
            markers: BTreeMap::new(),
            pending_markers: BTreeMap::new(),
            pending_poses: BTreeMap::new(),
        }
    }

    /// Sequence number of the last committed update.
    pub fn seq_num(&self) -> u64 {
        self.seq_num
    }

    /// Number of committed markers.
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Get a committed marker.
    pub fn get(&self, name: &str) -> Option<&InteractiveMarker> {
        self.markers.get(name)
    }

    /// Returns true if there are queued changes.
    pub fn has_pending(&self) -> bool {
        !self.pending_markers.is_empty() || !self.pending_poses.is_empty()
    }

    pub fn insert(&mut self, marker: InteractiveMarker) {
        // A full definition supersedes any pose queued before it
        self.pending_poses.remove(&marker.name);
        self.pending_markers.insert(marker.name.clone(), marker);
    }

    pub fn set_pose(&mut self, name: &str, pose: PoseMsg) -> bool {
        if let Some(m) = self.pending_markers.get_mut(name) {
            m.pose = pose;
            return true
        }

        if self.markers.contains_key(name) {
            self.pending_poses.insert(name.to_string(), pose);
            return true
        }

        false
    }

    /// Commit the queued changes, returning the update describing them.
    ///
    /// Returns `None` if nothing was queued.
    pub fn apply_changes(&mut self) -> Option<InteractiveMarkerUpdate> {
        if !self.has_pending() {
            return None
        }

        self.seq_num += 1;

        let mut update = InteractiveMarkerUpdate {
            server_id: self.server_id.clone(),
            seq_num: self.seq_num,
            markers: Vec::with_capacity(self.pending_markers.len()),
            poses: Vec::with_capacity(self.pending_poses.len()),
            erases: Vec::new(),
        };

        for (name, marker) in std::mem::take(&mut self.pending_markers) {
            update.markers.push(marker.clone());
            self.markers.insert(name, marker);
        }

        for (name, pose) in std::mem::take(&mut self.pending_poses) {
            if let Some(m) = self.markers.get_mut(&name) {
                m.pose = pose;
                update.poses.push(InteractiveMarkerPose {
                    header: m.header.clone(),
                    name,
                    pose,
                });
            }
        }

        Some(update)
    }

    /// All committed markers.
    pub fn snapshot(&self) -> InteractiveMarkerInit {
        InteractiveMarkerInit {
            server_id: self.server_id.clone(),
            seq_num: self.seq_num,
            markers: self.markers.values().cloned().collect(),
        }
    }
}

impl MarkerServer for MarkerRegistry {
    type Error = Infallible;

    fn insert(&mut self, marker: InteractiveMarker) -> Result<(), Self::Error> {
        MarkerRegistry::insert(self, marker);
        Ok(())
    }

    fn set_pose(&mut self, name: &str, pose: PoseMsg) -> Result<bool, Self::Error> {
        Ok(MarkerRegistry::set_pose(self, name, pose))
    }

    fn apply_changes(&mut self) -> Result<(), Self::Error> {
        MarkerRegistry::apply_changes(self);
        Ok(())
    }
}

impl MarkerPublisher {
    /// Create a new marker publisher.
    ///
    /// The socket binds to the marker server endpoint and does not wait for subscribers.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        server_id: &str
    ) -> Result<Self, MarkerPublisherError> {
        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            SocketOptions::publisher(),
            &params.marker_server_endpoint
        ).map_err(MarkerPublisherError::SocketError)?;

        Ok(Self {
            registry: MarkerRegistry::new(server_id),
            socket
        })
    }

    /// Publish every committed marker.
    pub fn publish_full(&mut self) -> Result<(), MarkerPublisherError> {
        let snapshot = self.registry.snapshot();
        trace!("Publishing full update with {} markers", snapshot.markers.len());
        self.send(&MarkerServerMsg::UpdateFull(snapshot))
    }

    fn send(&self, msg: &MarkerServerMsg) -> Result<(), MarkerPublisherError> {
        let msg_str = serde_json::to_string(msg)
            .map_err(MarkerPublisherError::SerializationError)?;

        self.socket.send(&msg_str, 0)
            .map_err(MarkerPublisherError::SendError)
    }
}

impl MarkerServer for MarkerPublisher {
    type Error = MarkerPublisherError;

    fn insert(&mut self, marker: InteractiveMarker) -> Result<(), Self::Error> {
        self.registry.insert(marker);
        Ok(())
    }

    fn set_pose(&mut self, name: &str, pose: PoseMsg) -> Result<bool, Self::Error> {
        Ok(self.registry.set_pose(name, pose))
    }

    fn apply_changes(&mut self) -> Result<(), Self::Error> {
        match self.registry.apply_changes() {
            Some(update) => {
                debug!(
                    "Publishing update {} ({} markers, {} poses)",
                    update.seq_num,
                    update.markers.len(),
                    update.poses.len()
                );
                self.send(&MarkerServerMsg::Update(update))
            },
            None => Ok(())
        }
    }
}
