//! # Waypoint Exporter
//!
//! Writes the final set of waypoints to a CSV file, joined with the reach radii computed by the
//! reach-threshold process.
//!
//! The exporter waits for a set of reach radii, then exports the first full marker snapshot it
//! receives. Each snapshot marker is converted into a typed [`WaypointSnapshot`] before anything is
//! written, so a malformed snapshot leaves no file behind. A failed export is final, the exporter
//! will not try again. Records are written in ascending numeric ID order and radii are paired with
//! waypoints by position. Poses are written exactly as the marker server reported them:
//!
//! ```text
//! x,y,0.0,qx,qy,qz,qw,is_search_area,reach_diameter
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::Duration,
};

use chrono::{DateTime, Local};
use comms_if::eqpt::{
    geom::PoseMsg,
    marker::{InteractiveMarker, InteractiveMarkerInit, MarkerArray},
};
use log::{debug, error, info, warn};
use serde::Serialize;
use util::archive::{ArchiveError, Archiver};

use crate::{reach::ReachRadiusCache, store::WaypointId};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Index of the control whose first visual carries the search area flag.
pub const SEARCH_AREA_CONTROL_IDX: usize = 2;

/// A red channel strictly above this marks the waypoint as a search area.
pub const SEARCH_AREA_RED_SENTINEL: f32 = 1.0;

/// Format of the export file name, in local time.
pub const EXPORT_FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A waypoint as read from a marker snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaypointSnapshot {
    pub id: WaypointId,

    /// Pose of the marker as published
    pub pose: PoseMsg,

    pub is_search_area: bool,
}

/// One line of the export file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExportRecord {
    pub x_m: f64,
    pub y_m: f64,

    /// Always zero, waypoints lie on the ground plane
    pub z_m: f64,

    pub qx: f64,
    pub qy: f64,
    pub qz: f64,
    pub qw: f64,

    /// 1 for a search area, 0 otherwise
    pub is_search_area: u8,

    /// Twice the reach radius
    pub reach_diameter_m: f64,
}

/// Exports the waypoints once, as soon as both reach radii and a snapshot are available.
pub struct WaypointExporter {
    state: ExportState,

    reach: ReachRadiusCache,

    file_path: PathBuf,

    complete_tx: Option<Sender<PathBuf>>,
}

/// Handle used to wait for the export to complete.
pub struct ExportCompletion {
    rx: Receiver<PathBuf>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ExportState {
    /// No reach radii have been received yet, snapshots are ignored
    AwaitingRadii,

    /// Radii are cached, the next snapshot will be exported
    Ready,

    /// The waypoints have been written to the given file
    Exported(PathBuf),

    /// The export failed, no further snapshots are handled
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Marker name '{0}' is not a valid waypoint ID")]
    MalformedId(String),

    #[error("Could not write the export file: {0}")]
    ArchiveError(ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WaypointSnapshot {
    /// Read a waypoint out of a snapshot marker.
    pub fn from_marker(marker: &InteractiveMarker) -> Result<Self, ExportError> {
        let id = marker.name
            .parse::<WaypointId>()
            .map_err(|_| ExportError::MalformedId(marker.name.clone()))?;

        Ok(Self {
            id,
            pose: marker.pose,
            is_search_area: is_search_area_marker(marker),
        })
    }
}

impl ExportRecord {
    pub fn new(wp: &WaypointSnapshot, reach_radius_m: f64) -> Self {
        let q = &wp.pose.orientation;

        Self {
            x_m: wp.pose.position.x,
            y_m: wp.pose.position.y,
            z_m: 0.0,
            qx: q.x,
            qy: q.y,
            qz: q.z,
            qw: q.w,
            is_search_area: wp.is_search_area as u8,
            reach_diameter_m: 2.0 * reach_radius_m,
        }
    }
}

impl WaypointExporter {
    /// Create a new exporter which will write to `file_path`.
    ///
    /// The returned [`ExportCompletion`] resolves once the export has been written.
    pub fn new<P: AsRef<Path>>(file_path: P) -> (Self, ExportCompletion) {
        let (tx, rx) = mpsc::channel();

        let exporter = Self {
            state: ExportState::AwaitingRadii,
            reach: ReachRadiusCache::new(),
            file_path: file_path.as_ref().to_path_buf(),
            complete_tx: Some(tx),
        };

        (exporter, ExportCompletion { rx })
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Handle a new set of reach markers.
    pub fn on_reach_markers(&mut self, markers: &MarkerArray) {
        self.reach.replace_from_markers(markers);

        if let ExportState::AwaitingRadii = self.state {
            info!("Reach radii received, ready to export");
            self.state = ExportState::Ready;
        }
    }

    /// Handle a full marker snapshot.
    ///
    /// Returns `Ok(true)` if the snapshot was exported, `Ok(false)` if it was ignored. An error is
    /// terminal: the exporter moves to [`ExportState::Failed`], ignores every later snapshot and
    /// the completion resolves without a file.
    pub fn on_snapshot(&mut self, snapshot: &InteractiveMarkerInit) -> Result<bool, ExportError> {
        match self.state {
            ExportState::AwaitingRadii => {
                debug!(
                    "Snapshot {} received before any reach radii, ignoring",
                    snapshot.seq_num
                );
                return Ok(false)
            },
            ExportState::Exported(_) => {
                debug!("Snapshot {} received after export, ignoring", snapshot.seq_num);
                return Ok(false)
            },
            ExportState::Failed => {
                debug!("Snapshot {} received after a failed export, ignoring", snapshot.seq_num);
                return Ok(false)
            },
            ExportState::Ready => ()
        }

        let num_records = match self.write_file(snapshot) {
            Ok(n) => n,
            Err(e) => {
                self.state = ExportState::Failed;
                self.complete_tx = None;
                return Err(e)
            }
        };

        info!("Exported {} waypoints to {:?}", num_records, self.file_path);

        self.state = ExportState::Exported(self.file_path.clone());

        if let Some(tx) = self.complete_tx.take() {
            // The receiver may already be gone, in which case nobody is waiting
            tx.send(self.file_path.clone()).ok();
        }

        Ok(true)
    }

    fn write_file(&self, snapshot: &InteractiveMarkerInit) -> Result<usize, ExportError> {
        // Validate everything before touching the file system
        let waypoints = sort_snapshots(&snapshot.markers)?;

        let mut archiver = Archiver::create(&self.file_path, false)
            .map_err(ExportError::ArchiveError)?;

        export_all(&waypoints, self.reach.radii(), &mut archiver)
            .and_then(|n| archiver.finish().map(|_| n).map_err(ExportError::ArchiveError))
            .map_err(|e| {
                if let Err(rm_err) = fs::remove_file(&self.file_path) {
                    warn!(
                        "Could not remove partial export {:?}: {}",
                        self.file_path, rm_err
                    );
                }
                e
            })
    }
}

impl ExportCompletion {
    /// Block until the export completes, returning the path of the written file.
    ///
    /// Returns `None` if the export failed or the exporter was dropped without exporting.
    pub fn wait(&self) -> Option<PathBuf> {
        self.rx.recv().ok()
    }

    /// Block until the export completes or the timeout elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<PathBuf, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Returns true if the marker carries the search area colour sentinel.
///
/// Markers without the sentinel control or visual are normal waypoints.
pub fn is_search_area_marker(marker: &InteractiveMarker) -> bool {
    marker
        .control_marker(SEARCH_AREA_CONTROL_IDX, 0)
        .map(|m| m.color.r > SEARCH_AREA_RED_SENTINEL)
        .unwrap_or(false)
}

/// Convert snapshot markers into waypoints sorted by ascending numeric ID.
pub fn sort_snapshots(markers: &[InteractiveMarker]) -> Result<Vec<WaypointSnapshot>, ExportError> {
    let mut waypoints = markers
        .iter()
        .map(WaypointSnapshot::from_marker)
        .collect::<Result<Vec<_>, _>>()?;

    waypoints.sort_by_key(|wp| wp.id);

    Ok(waypoints)
}

/// Write one record per waypoint, pairing the `i`th waypoint with the `i`th radius.
///
/// `waypoints` must already be in ascending ID order, as returned by [`sort_snapshots`]. If the
/// counts differ only the pairs that exist are written and the mismatch is logged. Returns the
/// number of records written.
pub fn export_all<W: Write>(
    waypoints: &[WaypointSnapshot],
    radii_m: &[f64],
    archiver: &mut Archiver<W>
) -> Result<usize, ExportError> {
    if waypoints.len() != radii_m.len() {
        error!(
            "Number of waypoints ({}) does not match number of reach radii ({}), \
            pairing by position",
            waypoints.len(),
            radii_m.len()
        );
    }

    let mut num_records = 0;

    for (wp, radius_m) in waypoints.iter().zip(radii_m.iter()) {
        archiver
            .serialise(ExportRecord::new(wp, *radius_m))
            .map_err(ExportError::ArchiveError)?;
        num_records += 1;
    }

    for wp in waypoints.iter().skip(radii_m.len()) {
        warn!("Waypoint {} has no reach radius and was not exported", wp.id);
    }

    Ok(num_records)
}

/// Name of the export file for a saver started at `start_time`.
pub fn export_file_name(start_time: DateTime<Local>) -> String {
    format!("{}.csv", start_time.format(EXPORT_FILE_TIMESTAMP_FORMAT))
}
