//! # Waypoint Saver Executable
//!
//! Waits for the reach radii and a full marker snapshot, writes the waypoints to a timestamped CSV
//! file and exits.
//!
//! The subscribers are polled on a background dispatch thread while the main thread waits for the
//! export to complete. Once it has the dispatch thread is stopped and joined. If the export fails
//! the dispatch thread stops by itself and the saver exits with the export error.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{
    fs,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::RecvTimeoutError,
        Arc,
    },
    thread,
    time::Duration,
};

use chrono::Local;
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use log::info;

use comms_if::{
    eqpt::marker::{MarkerArray, MarkerServerMsg},
    net::{zmq, NetParams},
};
use util::{
    logger::{logger_init, parse_level},
    session::Session,
};
use wp_lib::{
    export::{export_file_name, ExportError, WaypointExporter},
    params::SaverParams,
    sub_client::{log_connection_change, log_recv_error, SubClient},
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    let session = Session::new("wp_saver", "sessions")
        .wrap_err("Failed to create the session")?;

    let params: SaverParams = util::params::load("wp_saver.toml")
        .wrap_err("Could not load saver params")?;

    logger_init(parse_level(&params.log_level)?, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Waypoint Saver\n");
    info!("Session directory: {:?}\n", session.session_root);

    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;

    if !(params.wait_log_period_s > 0.0) {
        return Err(eyre!(
            "wait_log_period_s must be positive, got {}", params.wait_log_period_s
        ))
    }

    // ---- OUTPUT FILE ----

    fs::create_dir_all(&params.output_dir)
        .wrap_err_with(|| format!("Could not create output directory {:?}", params.output_dir))?;

    let mut file_path = PathBuf::from(&params.output_dir);
    file_path.push(export_file_name(Local::now()));
    info!("Waypoints will be saved to {:?}", file_path);

    let (exporter, completion) = WaypointExporter::new(&file_path);

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = zmq::Context::new();

    let snapshot_client: SubClient<MarkerServerMsg> = SubClient::new(
        &zmq_ctx,
        &net_params.marker_server_endpoint,
        params.recv_timeout_ms
    ).wrap_err("Failed to initialise the marker server client")?;
    info!("Subscribed to markers on {}", snapshot_client.endpoint());

    let reach_client: SubClient<MarkerArray> = SubClient::new(
        &zmq_ctx,
        &net_params.reach_markers_endpoint,
        params.recv_timeout_ms
    ).wrap_err("Failed to initialise the reach markers client")?;
    info!("Subscribed to reach markers on {}", reach_client.endpoint());

    // ---- DISPATCH THREAD ----

    let run = Arc::new(AtomicBool::new(true));
    let run_clone = run.clone();

    let dispatch_handle = thread::spawn(move || dispatch(
        exporter,
        snapshot_client,
        reach_client,
        run_clone
    ));

    // ---- WAIT FOR EXPORT ----

    let wait_period = Duration::from_secs_f64(params.wait_log_period_s);

    let saved_path = loop {
        match completion.wait_timeout(wait_period) {
            Ok(path) => break Some(path),
            Err(RecvTimeoutError::Timeout) => {
                info!("Still waiting for reach radii and a marker snapshot")
            },
            Err(RecvTimeoutError::Disconnected) => break None
        }
    };

    // ---- SHUTDOWN ----

    run.store(false, Ordering::Relaxed);
    dispatch_handle
        .join()
        .map_err(|_| eyre!("The dispatch thread panicked"))?
        .wrap_err("Could not export the waypoints")?;

    let path = saved_path
        .ok_or_else(|| eyre!("The dispatch thread stopped before the waypoints were saved"))?;
    info!("Saved to {:?}", path);

    info!("End of execution");

    Ok(())
}

/// Poll both subscribers and hand their messages to the exporter until `run` is cleared.
///
/// Returns early with the error if the export fails.
fn dispatch(
    mut exporter: WaypointExporter,
    mut snapshot_client: SubClient<MarkerServerMsg>,
    mut reach_client: SubClient<MarkerArray>,
    run: Arc<AtomicBool>
) -> Result<(), ExportError> {
    let mut snapshot_connected = false;
    let mut reach_connected = false;

    while run.load(Ordering::Relaxed) {
        log_connection_change("marker", &snapshot_client, &mut snapshot_connected);
        log_connection_change("reach markers", &reach_client, &mut reach_connected);

        match reach_client.receive() {
            Ok(Some(markers)) => exporter.on_reach_markers(&markers),
            Ok(None) => (),
            Err(e) => log_recv_error("reach markers", e),
        }

        match snapshot_client.receive() {
            Ok(Some(MarkerServerMsg::UpdateFull(snapshot))) => {
                exporter.on_snapshot(&snapshot)?;
            },
            // Only full snapshots are exported
            Ok(Some(MarkerServerMsg::Update(_))) => (),
            Ok(None) => (),
            Err(e) => log_recv_error("marker", e),
        }
    }

    Ok(())
}
