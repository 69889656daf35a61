//! # Waypoint Generator Executable
//!
//! Samples waypoints from the localisation pose stream, publishes them as interactive markers and
//! applies operator edits reported by the marker renderer.
//!
//! The executable runs a single dispatch loop:
//!     - Drain the localisation pose subscriber, creating waypoints as the gate fires
//!     - Drain the marker feedback subscriber, applying pose edits
//!     - Republish the full marker snapshot once per `full_update_period_s`
//!
//! It runs until it is killed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::time::{Duration, Instant};

use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::{error, info, warn};

use comms_if::{
    eqpt::{marker::InteractiveMarkerFeedback, perloc::LocPose},
    net::{zmq, NetParams},
};
use util::{
    logger::{logger_init, parse_level},
    session::Session,
};
use wp_lib::{
    generator::WaypointGenerator,
    marker_server::MarkerPublisher,
    params::GeneratorParams,
    sub_client::{log_connection_change, log_recv_error, SubClient},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("wp_generator", "sessions")
        .wrap_err("Failed to create the session")?;

    let params: GeneratorParams = util::params::load("wp_generator.toml")
        .wrap_err("Could not load generator params")?;

    logger_init(parse_level(&params.log_level)?, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Waypoint Generator\n");
    info!("Session directory: {:?}\n", session.session_root);

    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;

    info!(
        "Gate thresholds: {:.3} m, {:.4} rad",
        params.dist_thresh_m, params.yaw_thresh_rad
    );

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = zmq::Context::new();

    let mut pose_client: SubClient<LocPose> = SubClient::new(
        &zmq_ctx,
        &net_params.loc_pose_endpoint,
        params.recv_timeout_ms
    ).wrap_err("Failed to initialise the localisation pose client")?;
    info!("Subscribed to poses on {}", pose_client.endpoint());

    let mut feedback_client: SubClient<InteractiveMarkerFeedback> = SubClient::new(
        &zmq_ctx,
        &net_params.marker_feedback_endpoint,
        params.recv_timeout_ms
    ).wrap_err("Failed to initialise the marker feedback client")?;
    info!("Subscribed to feedback on {}", feedback_client.endpoint());

    let mut server = MarkerPublisher::new(&zmq_ctx, &net_params, &params.server_id)
        .wrap_err("Failed to initialise the marker server")?;
    info!("Marker server bound to {}", net_params.marker_server_endpoint);

    // ---- MAIN LOOP ----

    let mut generator = WaypointGenerator::new(params.thresholds());

    if !(params.full_update_period_s > 0.0) {
        return Err(eyre!(
            "full_update_period_s must be positive, got {}", params.full_update_period_s
        ))
    }
    let full_update_period = Duration::from_secs_f64(params.full_update_period_s);
    let mut last_full_update = Instant::now();

    info!("Begining main loop\n");

    let mut pose_connected = false;
    let mut feedback_connected = false;

    loop {
        log_connection_change("pose", &pose_client, &mut pose_connected);
        log_connection_change("feedback", &feedback_client, &mut feedback_connected);

        // Poses
        loop {
            match pose_client.receive() {
                Ok(Some(loc_pose)) => {
                    if let Err(e) = generator.on_pose(&loc_pose, &mut server) {
                        error!("Could not create a waypoint marker: {}", e);
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    log_recv_error("pose", e);
                    break
                },
            }
        }

        // Feedback
        loop {
            match feedback_client.receive() {
                Ok(Some(fb)) => {
                    if let Err(e) = generator.on_feedback(&fb, &mut server) {
                        error!("Could not publish the marker feedback: {}", e);
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    log_recv_error("feedback", e);
                    break
                },
            }
        }

        // Full snapshot
        if last_full_update.elapsed() >= full_update_period {
            if let Err(e) = server.publish_full() {
                warn!("Could not publish the full marker update: {}", e);
            }
            last_full_update = Instant::now();
        }
    }
}
