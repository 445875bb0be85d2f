//! A working folder holding everything needed to solve one sheet pose.
//!
//! The folder may contain `camera.json`, `distortion.json` and
//! `calibration.jpg`. Each file is optional; a present file that fails to
//! load is an error.

use crate::camera::{
    load_camera_intrinsics, load_distortion_coeffs, DistortionCoefficients, Intrinsics,
};
use crate::imageio::{load_image, ImageDecodeError};
use crate::pnp::{solve_pnp, PnpResult, PoseSolveError};
use crate::storage::StorageError;
use crate::target::A4SheetOfPaper;

use image::RgbImage;
use log::info;
use std::path::{Path, PathBuf};

pub const CAMERA_FILE: &str = "camera.json";
pub const DISTORTION_FILE: &str = "distortion.json";
pub const IMAGE_FILE: &str = "calibration.jpg";

#[derive(thiserror::Error, Debug)]
pub enum WorkspaceError {
    #[error("{0} is not a directory")]
    NotADirectory(String),
    #[error("No camera intrinsics loaded")]
    MissingIntrinsics,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Image(#[from] ImageDecodeError),
    #[error(transparent)]
    Solve(#[from] PoseSolveError),
}

#[derive(Debug, Clone)]
pub struct WorkingFolder {
    pub root: PathBuf,
    pub intrinsics: Option<Intrinsics>,
    pub distortion: Option<DistortionCoefficients>,
    pub image: Option<RgbImage>,
}

impl WorkingFolder {
    /// Loads whichever of the known files exist under `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, WorkspaceError> {
        let root = dir.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(WorkspaceError::NotADirectory(root.display().to_string()));
        }

        let camera_path = root.join(CAMERA_FILE);
        let intrinsics = if camera_path.exists() {
            Some(load_camera_intrinsics(&camera_path)?)
        } else {
            None
        };

        let distortion_path = root.join(DISTORTION_FILE);
        let distortion = if distortion_path.exists() {
            Some(load_distortion_coeffs(&distortion_path)?)
        } else {
            None
        };

        let image_path = root.join(IMAGE_FILE);
        let image = if image_path.exists() {
            Some(load_image(&image_path)?)
        } else {
            None
        };

        info!(
            "Opened working folder {} (camera: {}, distortion: {}, image: {})",
            root.display(),
            intrinsics.is_some(),
            distortion.is_some(),
            image.is_some()
        );

        Ok(WorkingFolder {
            root,
            intrinsics,
            distortion,
            image,
        })
    }

    /// Solves the pose of `sheet` with the loaded calibration.
    ///
    /// Missing distortion coefficients mean no distortion.
    pub fn solve(&self, sheet: &A4SheetOfPaper) -> Result<PnpResult, WorkspaceError> {
        let intrinsics = self.intrinsics.ok_or(WorkspaceError::MissingIntrinsics)?;
        let distortion = self.distortion.unwrap_or_default();
        Ok(solve_pnp(sheet, &intrinsics, &distortion)?)
    }
}
