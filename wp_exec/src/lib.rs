//! # Waypoint library.
//!
//! Samples the robot's pose stream into waypoints, keeps them editable through an interactive
//! marker server, and saves the operator-approved set alongside their reach thresholds.
//!
//! The executables in this crate (`wp_generator` and `wp_saver`) are thin dispatch loops around
//! the items defined here.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Waypoint export - joins marker snapshots with reach radii and writes the waypoint file
pub mod export;

/// Feedback handling - applies operator edits to stored waypoints
pub mod feedback;

/// Pose delta gate - decides when the robot has moved far enough for a new waypoint
pub mod gate;

/// Waypoint generator - binds the gate, the store and the marker server together
pub mod generator;

/// Localisation types
pub mod loc;

/// Interactive marker server
pub mod marker_server;

/// Executable parameters
pub mod params;

/// Reach radius cache - the latest reach thresholds received
pub mod reach;

/// Waypoint store - owns the waypoints and assigns their IDs
pub mod store;

/// Subscriber client - non-blocking JSON subscriber used by the dispatch loops
pub mod sub_client;
