//! Draws the sheet's coordinate axes onto an image using a saved pose.
//!
//! X is drawn in red, Y in green and Z in blue.

use clap::Parser;
use log::info;
use paper_pnp::camera::{load_camera_intrinsics, load_distortion_coeffs};
use paper_pnp::cli::parse_args;
use paper_pnp::draw::draw_frame_axes;
use paper_pnp::imageio::{load_image, save_image};
use paper_pnp::pose::load_pnp_result;

use std::path::PathBuf;
use std::process::ExitCode;

const AXIS_LENGTH: f64 = 0.1;
const AXIS_THICKNESS: u32 = 6;

/// Draw the world frame of a solved pose onto an image
#[derive(Parser, Debug)]
#[command(name = "drawframe", version, about, arg_required_else_help = true)]
struct Cli {
    /// Image to draw on
    input_image: PathBuf,

    /// Camera intrinsics file (JSON or YAML)
    camera: PathBuf,

    /// Distortion coefficients file (JSON or YAML)
    distortion: PathBuf,

    /// Pose saved by solvepnp
    pnpresult: PathBuf,

    /// Where to write the annotated image
    output_image: PathBuf,
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut image = load_image(&cli.input_image)?;
    let intrinsics = load_camera_intrinsics(&cli.camera)?;
    let distortion = load_distortion_coeffs(&cli.distortion)?;
    let pose = load_pnp_result(&cli.pnpresult)?;

    draw_frame_axes(
        &mut image,
        &intrinsics,
        &distortion,
        &pose,
        AXIS_LENGTH,
        AXIS_THICKNESS,
    )?;

    save_image(&image, &cli.output_image)?;
    info!("Frame drawn into {}", cli.output_image.display());
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
