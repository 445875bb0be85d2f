//! Estimates the camera pose from the four corners of an A4 sheet of paper.
//!
//! Usage:
//! ```bash
//! solvepnp 236:121 404:121 404:359 236:359 samples/camera.json \
//!   samples/distortion.json output/pnpresult.json
//! ```

use clap::Parser;
use log::info;
use paper_pnp::camera::{load_camera_intrinsics, load_distortion_coeffs};
use paper_pnp::cli::{parse_args, parse_point2d};
use paper_pnp::pnp::solve_pnp;
use paper_pnp::pose::{camera_position, rotation_matrix, save_pnp_result};
use paper_pnp::target::A4SheetOfPaper;

use nalgebra::Point2;
use std::path::PathBuf;
use std::process::ExitCode;

/// Solve the pose of a camera looking at an A4 sheet of paper
#[derive(Parser, Debug)]
#[command(
    name = "solvepnp",
    version,
    about,
    arg_required_else_help = true,
    after_help = "Points must be specified counter-clockwise starting at the bottom left corner."
)]
struct Cli {
    /// Bottom left corner, in pixels (x:y)
    #[arg(value_parser = parse_point2d, allow_hyphen_values = true)]
    bottom_left: Point2<f64>,

    /// Bottom right corner, in pixels (x:y)
    #[arg(value_parser = parse_point2d, allow_hyphen_values = true)]
    bottom_right: Point2<f64>,

    /// Top right corner, in pixels (x:y)
    #[arg(value_parser = parse_point2d, allow_hyphen_values = true)]
    top_right: Point2<f64>,

    /// Top left corner, in pixels (x:y)
    #[arg(value_parser = parse_point2d, allow_hyphen_values = true)]
    top_left: Point2<f64>,

    /// Camera intrinsics file (JSON or YAML)
    camera: PathBuf,

    /// Distortion coefficients file (JSON or YAML)
    distortion: PathBuf,

    /// Where to save the estimated pose
    result: Option<PathBuf>,
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let intrinsics = load_camera_intrinsics(&cli.camera)?;
    let distortion = load_distortion_coeffs(&cli.distortion)?;
    info!("Loaded camera from {:?} and distortion from {:?}", cli.camera, cli.distortion);

    let sheet = A4SheetOfPaper::new(
        cli.bottom_left,
        cli.bottom_right,
        cli.top_right,
        cli.top_left,
    );

    let pose = solve_pnp(&sheet, &intrinsics, &distortion)
        .map_err(|e| format!("Failed at solving PnP problem: {e}"))?;

    println!("rvec: [{}, {}, {}]", pose.rvec.x, pose.rvec.y, pose.rvec.z);
    println!("tvec: [{}, {}, {}]", pose.tvec.x, pose.tvec.y, pose.tvec.z);

    let rotation = rotation_matrix(&pose.rvec);
    println!("Rotation matrix:");
    for row in rotation.row_iter() {
        println!("  [{:>12.8}, {:>12.8}, {:>12.8}]", row[0], row[1], row[2]);
    }

    let position = camera_position(&pose.rvec, &pose.tvec);
    println!(
        "Camera position: [{}, {}, {}]",
        position.x, position.y, position.z
    );

    if let Some(path) = &cli.result {
        save_pnp_result(path, &pose)?;
        println!("Results saved into {}", path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli: Cli = parse_args();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
