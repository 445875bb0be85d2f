//! Paper PnP Library
//!
//! Estimates the pose of a calibrated camera from the four corners of an A4
//! sheet of paper seen in an image. The library provides:
//! - Camera intrinsics and OpenCV-style lens distortion (`camera`)
//! - A planar Perspective-n-Point solver with Levenberg-Marquardt refinement
//!   built on tiny-solver (`pnp`)
//! - Pose persistence and rotation helpers (`pose`)
//! - Overlays for visual checks: contours and coordinate frames (`draw`)
//! - An interaction model for picking the sheet corners (`picker`)
//!
//! Calibration and pose files are keyed YAML or JSON documents, compatible
//! with OpenCV `FileStorage` output.

pub mod camera;
pub mod cli;
pub mod draw;
pub mod imageio;
pub mod picker;
pub mod pnp;
pub mod pose;
pub mod storage;
pub mod target;
pub mod workspace;

// Re-export commonly used types
pub use camera::{
    CalibratedCamera, CameraModel, CameraModelError, DistortionCoefficients, Intrinsics,
};
pub use pnp::{solve_pnp, PnpResult, PoseSolveError, SolvePnpOptions};
pub use storage::StorageError;
pub use target::A4SheetOfPaper;
