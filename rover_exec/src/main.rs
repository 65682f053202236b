//! Main rover-side executable entry point.
//!
//! Replays a run recorded from the simulator through perception and decision, archiving what each
//! module reported every cycle.
//!
//! # Usage
//!
//! ```text
//! rover_exec <dataset_dir>
//! ```
//!
//! The dataset directory must contain `robot_log.csv`, with one row per camera frame:
//!
//! ```text
//! Path;SteerAngle;Throttle;Brake;Speed;X_Position;Y_Position;Pitch;Yaw;Roll
//! ```
//!
//! Image paths are resolved against the dataset directory. At the end of the run the world map is
//! saved into the session directory, along with a summary of the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

// Internal
use rover_lib::{
    decision::DecisionMgr,
    map::{Fidelity, MapStats},
    per::PerMgr,
    state::RoverState,
};
use util::{
    archive::Archiver,
    host,
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Name of the log file inside a dataset directory.
const ROBOT_LOG_FILE: &str = "robot_log.csv";

/// Directory inside a dataset where the frames are normally kept.
const IMAGE_DIR: &str = "IMG";

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Parameters of the executable itself.
#[derive(Debug, Deserialize)]
struct RoverExecParams {
    /// Path to a mask of the truly navigable terrain, relative to the software root.
    ///
    /// If given the map's fidelity is reported at the end of the run.
    ground_truth_path: Option<String>,

    /// Minimum counter value for a map cell to count as mapped
    map_confidence_min: u8,
}

/// One row of the simulator's log.
#[derive(Debug, Deserialize)]
struct LogRecord {
    #[serde(rename = "Path")]
    path: String,

    #[serde(rename = "SteerAngle")]
    _steer_angle: f64,

    #[serde(rename = "Throttle")]
    _throttle: f64,

    #[serde(rename = "Brake")]
    _brake: f64,

    #[serde(rename = "Speed")]
    speed: f64,

    #[serde(rename = "X_Position")]
    x_position: f64,

    #[serde(rename = "Y_Position")]
    y_position: f64,

    #[serde(rename = "Pitch")]
    pitch: f64,

    #[serde(rename = "Yaw")]
    yaw: f64,

    #[serde(rename = "Roll")]
    roll: f64,
}

/// Summary of the run, saved at the end.
#[derive(Debug, Serialize)]
struct RunSummary {
    frames_total: usize,
    frames_processed: usize,
    frames_skipped: usize,
    map_updates: usize,
    map_stats: MapStats,
    fidelity: Option<Fidelity>,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("rover_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Sample Return Rover Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- ARGUMENTS ----

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let dataset_dir = dataset_dir_from_args(&args)?;
    info!("Replaying dataset {:?}", dataset_dir);

    // ---- LOAD PARAMETERS ----

    let exec_params: RoverExecParams =
        util::params::load("rover_exec.toml").wrap_err("Could not load rover_exec params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let per_mgr = PerMgr::init("per.toml").wrap_err("Failed to initialise PerMgr")?;
    info!("PerMgr init complete");

    let decision_mgr =
        DecisionMgr::init("decision.toml").wrap_err("Failed to initialise DecisionMgr")?;
    info!("DecisionMgr init complete");

    let ground_truth = match exec_params.ground_truth_path {
        Some(ref p) => {
            let path = host::get_sw_root()
                .wrap_err("Failed to get the software root")?
                .join(p);
            let gt = image::open(&path)
                .wrap_err_with(|| format!("Failed to load the ground truth map {:?}", path))?
                .to_luma8();
            info!("Ground truth map loaded from {:?}", path);
            Some(gt)
        }
        None => None,
    };

    let mut per_arch = Archiver::from_path(&session, "per/report.csv")
        .wrap_err("Failed to create the perception archive")?;
    let mut decision_arch = Archiver::from_path(&session, "decision/report.csv")
        .wrap_err("Failed to create the decision archive")?;

    info!("Module initialisation complete\n");

    let mut state = RoverState::new(
        per_mgr.params().world_size,
        per_mgr.params().image_width,
        per_mgr.params().image_height,
    );

    // ---- MAIN LOOP ----

    let log_path = dataset_dir.join(ROBOT_LOG_FILE);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .from_path(&log_path)
        .wrap_err_with(|| format!("Failed to open the robot log {:?}", log_path))?;

    let mut summary = RunSummary {
        frames_total: 0,
        frames_processed: 0,
        frames_skipped: 0,
        map_updates: 0,
        map_stats: MapStats::default(),
        fidelity: None,
    };

    info!("Begining main loop\n");

    for (i, row) in reader.deserialize::<LogRecord>().enumerate() {
        summary.frames_total += 1;

        let record = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("Could not parse row {} of the robot log: {}", i, e);
                summary.frames_skipped += 1;
                continue;
            }
        };

        let image_path = resolve_image_path(&dataset_dir, &record.path);
        let image = match image::open(&image_path) {
            Ok(img) => img.to_rgb8(),
            Err(e) => {
                warn!("Could not load frame {} ({:?}): {}", i, image_path, e);
                summary.frames_skipped += 1;
                continue;
            }
        };

        // ---- DATA INPUT ----

        state.pos = Vector2::new(record.x_position, record.y_position);
        state.yaw = record.yaw;
        state.pitch = record.pitch;
        state.roll = record.roll;
        state.vel = record.speed;

        // ---- PERCEPTION ----

        let per_report = match per_mgr.step(&mut state, &image) {
            Ok(r) => r,
            Err(e) => {
                warn!("Perception failed on frame {}: {}", i, e);
                summary.frames_skipped += 1;
                continue;
            }
        };

        if per_report.map_updated {
            summary.map_updates += 1;
        }

        per_arch
            .serialise(per_report)
            .wrap_err("Failed to archive the perception report")?;

        // ---- DECISION ----

        let decision_report = decision_mgr.step(&mut state);

        debug!(
            "Frame {}: {} throttle {:.2} brake {:.2} steer {:.2}",
            i, state.mode, state.throttle, state.brake, state.steer
        );

        decision_arch
            .serialise(decision_report)
            .wrap_err("Failed to archive the decision report")?;

        summary.frames_processed += 1;
    }

    info!(
        "End of robot log reached, {} of {} frames processed\n",
        summary.frames_processed, summary.frames_total
    );

    // ---- SAVE RESULTS ----

    summary.map_stats = state.world_map.stats(exec_params.map_confidence_min);
    info!("Map statistics: {:?}", summary.map_stats);

    if let Some(ref gt) = ground_truth {
        match state.world_map.fidelity(gt, exec_params.map_confidence_min) {
            Ok(f) => {
                info!(
                    "Mapped {:.1} % of the terrain with {:.1} % fidelity",
                    f.percent_mapped, f.fidelity
                );
                summary.fidelity = Some(f);
            }
            Err(e) => warn!("Could not compare the map with the ground truth: {}", e),
        }
    }

    let map_path = session.session_root.join("world_map.png");
    state
        .world_map
        .to_image()
        .save(&map_path)
        .wrap_err("Failed to save the world map")?;
    info!("World map saved to {:?}", map_path);

    session
        .save_json("summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    info!("End of execution");

    Ok(())
}

/// Get the dataset directory from the command line, which must be the only argument.
fn dataset_dir_from_args(args: &[String]) -> Result<PathBuf, Report> {
    match args {
        [_, dir] => Ok(PathBuf::from(dir)),
        _ => Err(eyre!(
            "Expected a single argument, the dataset directory, found {}",
            args.len().saturating_sub(1)
        )),
    }
}

/// Find the frame referenced by a log row.
///
/// Relative paths are taken from the dataset directory. If nothing exists there the file is
/// looked for in the dataset's image directory, since logs are often moved after recording.
fn resolve_image_path(dataset_dir: &Path, record_path: &str) -> PathBuf {
    let path = Path::new(record_path.trim());

    let direct = if path.is_absolute() {
        path.to_path_buf()
    } else {
        dataset_dir.join(path)
    };

    if direct.exists() {
        return direct;
    }

    match path.file_name() {
        Some(name) => dataset_dir.join(IMAGE_DIR).join(name),
        None => direct,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dataset_dir_from_args() {
        assert_eq!(
            dataset_dir_from_args(&args(&["rover_exec", "data/run_1"])).unwrap(),
            PathBuf::from("data/run_1")
        );

        assert!(dataset_dir_from_args(&args(&["rover_exec"])).is_err());
        assert!(dataset_dir_from_args(&args(&["rover_exec", "a", "b"])).is_err());

        // Some platforms can start a process with no arguments at all
        let err = dataset_dir_from_args(&[]).unwrap_err();
        assert!(err.to_string().contains("found 0"));
    }

    #[test]
    fn test_resolve_image_path() {
        let dir = Path::new("/nonexistent/dataset");

        assert_eq!(
            resolve_image_path(dir, "../elsewhere/IMG/frame_1.jpg"),
            dir.join("IMG").join("frame_1.jpg")
        );
        assert_eq!(
            resolve_image_path(dir, "/abs/IMG/frame_2.jpg"),
            dir.join("IMG").join("frame_2.jpg")
        );
    }
}
