//! Draws a closed red outline through the given points.
//!
//! Usage:
//! ```bash
//! drawcontour calibration.jpg 236:121 404:121 404:359 236:359 output/contour.png
//! ```

use clap::Parser;
use log::info;
use paper_pnp::cli::{parse_args, parse_point2d};
use paper_pnp::draw::{draw_contour, RED};
use paper_pnp::imageio::{load_image, save_image};

use nalgebra::Point2;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const CONTOUR_THICKNESS: u32 = 8;

/// Draw a closed contour onto an image
#[derive(Parser, Debug)]
#[command(name = "drawcontour", version, about, arg_required_else_help = true)]
struct Cli {
    /// Image to draw on
    input_image: PathBuf,

    /// Contour points (x:y) followed by the output image
    #[arg(
        required = true,
        num_args = 1..,
        allow_hyphen_values = true,
        value_name = "POINTS... OUTPUT_IMAGE"
    )]
    rest: Vec<String>,
}

fn run(input: &Path, points: &[Point2<f64>], output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut image = load_image(input)?;
    draw_contour(&mut image, points, RED, CONTOUR_THICKNESS);
    save_image(&image, output)?;
    info!(
        "Contour of {} points drawn into {}",
        points.len(),
        output.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let cli: Cli = parse_args();
    let Some((output, point_args)) = cli.rest.split_last() else {
        return ExitCode::FAILURE;
    };

    let points = match point_args
        .iter()
        .map(|arg| parse_point2d(arg))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(points) => points,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&cli.input_image, &points, Path::new(output)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
