//! Camera intrinsics, the camera model trait and keyed intrinsics files.
//!
//! A calibrated camera in this crate is a pinhole camera ([`Intrinsics`])
//! followed by the 8-coefficient rational lens distortion model
//! ([`distortion::DistortionCoefficients`]). The two are combined in
//! [`calibrated::CalibratedCamera`], which implements [`CameraModel`].

pub mod calibrated;
pub mod distortion;

pub use calibrated::CalibratedCamera;
pub use distortion::{
    distortion_vector, load_distortion_coeffs, save_distortion_coeffs, DistortionCoefficients,
};

use crate::storage::{self, StorageError};
use nalgebra::{Matrix3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pinhole intrinsics: focal lengths and principal point, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    /// Creates intrinsics from focal lengths and principal point.
    ///
    /// # Arguments
    ///
    /// * `fx`, `fy` - Focal lengths along x and y, in pixels.
    /// * `cx`, `cy` - Principal point, in pixels.
    ///
    /// No validation is done here; see [`validation::validate_intrinsics`].
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Intrinsics { fx, fy, cx, cy }
    }

    /// Returns the 3x3 camera matrix `K`.
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CameraModelError {
    #[error("z is close to zero, point is at camera center")]
    PointAtCameraCenter,
    #[error("Focal length must be positive")]
    FocalLengthMustBePositive,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

/// Trait defining the core functionality for camera models
pub trait CameraModel {
    /// Project a 3D point in camera coordinates to pixel coordinates
    fn project(&self, point_3d: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError>;

    /// Unproject pixel coordinates to a unit-length ray in camera coordinates
    fn unproject(&self, point_2d: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError>;

    /// Validate camera parameters
    fn validate_params(&self) -> Result<(), CameraModelError>;
}

/// Common validation functions for camera parameters
pub mod validation {
    use super::*;

    /// Checks that the focal lengths are positive and the principal point finite.
    ///
    /// # Return Value
    ///
    /// [`CameraModelError::FocalLengthMustBePositive`] or
    /// [`CameraModelError::PrincipalPointMustBeFinite`] on failure.
    pub fn validate_intrinsics(intrinsics: &Intrinsics) -> Result<(), CameraModelError> {
        if intrinsics.fx <= 0.0 || intrinsics.fy <= 0.0 {
            return Err(CameraModelError::FocalLengthMustBePositive);
        }
        if !intrinsics.cx.is_finite() || !intrinsics.cy.is_finite() {
            return Err(CameraModelError::PrincipalPointMustBeFinite);
        }
        Ok(())
    }
}

/// Builds the camera matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
///
/// No validation is performed; a zero focal length yields a singular matrix.
///
/// # Examples
///
/// ```rust
/// use paper_pnp::camera::{intrinsic_matrix, Intrinsics};
///
/// let k = intrinsic_matrix(&Intrinsics::new(800.0, 810.0, 320.0, 240.0));
/// assert_eq!(k[(0, 0)], 800.0);
/// assert_eq!(k[(1, 2)], 240.0);
/// assert_eq!(k[(2, 2)], 1.0);
/// ```
pub fn intrinsic_matrix(intrinsics: &Intrinsics) -> Matrix3<f64> {
    intrinsics.matrix()
}

/// Loads camera intrinsics from a keyed document holding `cx`, `cy`, `fx` and `fy`.
///
/// # Errors
///
/// * [`StorageError::FileAccess`] if the file cannot be opened.
/// * [`StorageError::MissingField`] if one of the four keys is absent.
/// * [`StorageError::InvalidField`] if a key does not hold a number.
pub fn load_camera_intrinsics<P: AsRef<Path>>(path: P) -> Result<Intrinsics, StorageError> {
    let doc = storage::read_document(path)?;

    Ok(Intrinsics {
        fx: storage::read_real(&doc, "fx")?,
        fy: storage::read_real(&doc, "fy")?,
        cx: storage::read_real(&doc, "cx")?,
        cy: storage::read_real(&doc, "cy")?,
    })
}

/// Saves camera intrinsics under the keys `fx`, `fy`, `cx` and `cy`.
pub fn save_camera_intrinsics<P: AsRef<Path>>(
    path: P,
    intrinsics: &Intrinsics,
) -> Result<(), StorageError> {
    storage::write_document(path, intrinsics)
}
