//! Perspective-n-Point pose estimation for planar targets.
//!
//! The pose of the camera relative to the target is found in two stages:
//!
//! 1. A linear estimate. Image points are undistorted to normalized
//!    coordinates, a homography from the target plane is fitted with the
//!    normalized DLT ([`homography::dlt_homography`]) and decomposed into a
//!    rotation and translation ([`homography::pose_from_homography`]).
//! 2. An optional Levenberg-Marquardt refinement of the reprojection error
//!    under the full distortion model ([`refine::refine_pose_lm`]).
//!
//! The pose is only accepted if every target point lies in front of the
//! camera and the reprojection RMSE is finite. A tighter bound can be set
//! with [`SolvePnpOptions::max_reprojection_error`].
//!
//! Planar targets admit two nearly equivalent poses under strong noise or
//! weak perspective; no attempt is made to pick between them.

pub mod homography;
pub mod refine;

use crate::camera::{CalibratedCamera, CameraModelError, DistortionCoefficients, Intrinsics};
use crate::target::A4SheetOfPaper;

use log::{debug, info, warn};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Object points further than this from `z = 0` make the target non-planar.
const PLANAR_TOLERANCE: f64 = 1e-9;

/// A camera pose: `p_camera = R(rvec) · p_world + tvec`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PnpResult {
    /// Rotation vector (axis scaled by angle, radians).
    pub rvec: Vector3<f64>,
    /// Translation, in the units of the object points.
    pub tvec: Vector3<f64>,
}

#[derive(thiserror::Error, Debug)]
pub enum PoseSolveError {
    #[error("Degenerate point configuration: {0}")]
    DegenerateConfiguration(String),
    #[error("Pose estimation did not converge: {0}")]
    NotConverged(String),
    #[error("Numerical failure: {0}")]
    NumericalFailure(String),
    #[error("At least {required} correspondences are required, got {actual}")]
    InsufficientCorrespondences { required: usize, actual: usize },
    #[error("Got {object} object points but {image} image points")]
    MismatchedCorrespondences { object: usize, image: usize },
    #[error("Object points must lie on the z = 0 plane")]
    NonPlanarTarget,
}

/// Tuning of the pose solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolvePnpOptions {
    /// Run the Levenberg-Marquardt refinement after the linear estimate.
    pub refine: bool,
    /// Largest accepted reprojection RMSE, in pixels. `None` accepts any finite error.
    pub max_reprojection_error: Option<f64>,
}

impl Default for SolvePnpOptions {
    fn default() -> Self {
        SolvePnpOptions {
            refine: true,
            max_reprojection_error: None,
        }
    }
}

/// Estimates the pose of the camera relative to an A4 sheet of paper.
///
/// Uses [`SolvePnpOptions::default`].
///
/// # Examples
///
/// ```rust
/// use nalgebra::Point2;
/// use paper_pnp::camera::{DistortionCoefficients, Intrinsics};
/// use paper_pnp::pnp::solve_pnp;
/// use paper_pnp::target::A4SheetOfPaper;
///
/// let sheet = A4SheetOfPaper::new(
///     Point2::new(236.0, 121.2),
///     Point2::new(404.0, 121.2),
///     Point2::new(404.0, 358.8),
///     Point2::new(236.0, 358.8),
/// );
/// let intrinsics = Intrinsics::new(800.0, 800.0, 320.0, 240.0);
///
/// let pose = solve_pnp(&sheet, &intrinsics, &DistortionCoefficients::default()).unwrap();
/// assert!((pose.tvec.z - 1.0).abs() < 1e-6);
/// assert!(pose.rvec.norm() < 1e-6);
/// ```
pub fn solve_pnp(
    sheet: &A4SheetOfPaper,
    intrinsics: &Intrinsics,
    distortion: &DistortionCoefficients,
) -> Result<PnpResult, PoseSolveError> {
    solve_pnp_with_options(sheet, intrinsics, distortion, &SolvePnpOptions::default())
}

/// Estimates the pose of the camera relative to an A4 sheet of paper with explicit solver options.
///
/// The four sheet corners are paired with [`A4SheetOfPaper::object_points`]
/// and handed to [`solve_planar_pnp`].
///
/// # Arguments
///
/// * `sheet` - Pixel positions of the corners, bottom left first, counter-clockwise.
/// * `intrinsics` - Pinhole intrinsics of the camera.
/// * `distortion` - Lens distortion of the camera; all zeros for none.
/// * `options` - Refinement switch and optional reprojection error bound.
///
/// # Return Value
///
/// The world-to-camera pose in meters, or the [`PoseSolveError`] described on
/// [`solve_planar_pnp`].
pub fn solve_pnp_with_options(
    sheet: &A4SheetOfPaper,
    intrinsics: &Intrinsics,
    distortion: &DistortionCoefficients,
    options: &SolvePnpOptions,
) -> Result<PnpResult, PoseSolveError> {
    solve_planar_pnp(
        &A4SheetOfPaper::object_points(),
        &sheet.image_points(),
        intrinsics,
        distortion,
        options,
    )
}

/// Estimates a camera pose from `n >= 4` correspondences with a planar (`z = 0`) target.
///
/// # Errors
///
/// * [`PoseSolveError::MismatchedCorrespondences`] if the slices differ in length.
/// * [`PoseSolveError::InsufficientCorrespondences`] with fewer than four pairs.
/// * [`PoseSolveError::NonPlanarTarget`] if an object point is off the `z = 0` plane.
/// * [`PoseSolveError::DegenerateConfiguration`] for coincident or collinear points.
/// * [`PoseSolveError::NumericalFailure`] if undistortion or a decomposition fails.
/// * [`PoseSolveError::NotConverged`] if the final pose puts points behind the
///   camera or exceeds the reprojection error bound.
pub fn solve_planar_pnp(
    object_points: &[Point3<f64>],
    image_points: &[Point2<f64>],
    intrinsics: &Intrinsics,
    distortion: &DistortionCoefficients,
    options: &SolvePnpOptions,
) -> Result<PnpResult, PoseSolveError> {
    if object_points.len() != image_points.len() {
        return Err(PoseSolveError::MismatchedCorrespondences {
            object: object_points.len(),
            image: image_points.len(),
        });
    }
    if object_points.len() < 4 {
        return Err(PoseSolveError::InsufficientCorrespondences {
            required: 4,
            actual: object_points.len(),
        });
    }
    if object_points.iter().any(|p| p.z.abs() > PLANAR_TOLERANCE) {
        return Err(PoseSolveError::NonPlanarTarget);
    }

    let camera = CalibratedCamera::new(*intrinsics, *distortion);
    let mut result = PnpResult::default();

    let normalized = image_points
        .iter()
        .map(|p| camera.normalize(&p.coords).map(Point2::from))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PoseSolveError::NumericalFailure(e.to_string()))?;
    let plane: Vec<Point2<f64>> = object_points.iter().map(|p| Point2::new(p.x, p.y)).collect();

    let h = homography::dlt_homography(&plane, &normalized)?;
    let (rvec, tvec) = homography::pose_from_homography(&h)?;
    result.rvec = rvec;
    result.tvec = tvec;
    debug!("Linear pose estimate: rvec = {:?}, tvec = {:?}", rvec, tvec);

    if options.refine {
        match refine::refine_pose_lm(object_points, image_points, &camera, &result) {
            Ok(refined) => {
                let linear_error = reprojection_rmse(object_points, image_points, &result, &camera)
                    .unwrap_or(f64::INFINITY);
                let refined_error =
                    reprojection_rmse(object_points, image_points, &refined, &camera)
                        .unwrap_or(f64::INFINITY);
                debug!(
                    "Reprojection RMSE: linear {:.6} px, refined {:.6} px",
                    linear_error, refined_error
                );
                if refined_error <= linear_error || !linear_error.is_finite() {
                    result = refined;
                }
            }
            Err(e) => warn!("Pose refinement failed, keeping the linear estimate: {}", e),
        }
    }

    let rmse = match reprojection_rmse(object_points, image_points, &result, &camera) {
        Ok(rmse) => rmse,
        Err(CameraModelError::PointAtCameraCenter) => {
            return Err(PoseSolveError::NotConverged(
                "object points lie behind the camera".to_string(),
            ))
        }
        Err(e) => return Err(PoseSolveError::NumericalFailure(e.to_string())),
    };

    if !rmse.is_finite() {
        return Err(PoseSolveError::NotConverged(
            "reprojection error is not finite".to_string(),
        ));
    }
    if let Some(bound) = options.max_reprojection_error {
        if rmse > bound {
            return Err(PoseSolveError::NotConverged(format!(
                "reprojection RMSE {:.3} px exceeds {:.3} px",
                rmse, bound
            )));
        }
    }

    info!(
        "Solved PnP with {} points: rvec = [{:.6}, {:.6}, {:.6}], tvec = [{:.6}, {:.6}, {:.6}], RMSE = {:.4} px",
        object_points.len(),
        result.rvec.x,
        result.rvec.y,
        result.rvec.z,
        result.tvec.x,
        result.tvec.y,
        result.tvec.z,
        rmse
    );

    Ok(result)
}

/// Root-mean-square pixel distance between `image_points` and the projected `object_points`.
///
/// # Errors
///
/// [`CameraModelError::PointAtCameraCenter`] if an object point is not in
/// front of the camera.
pub fn reprojection_rmse(
    object_points: &[Point3<f64>],
    image_points: &[Point2<f64>],
    pose: &PnpResult,
    camera: &CalibratedCamera,
) -> Result<f64, CameraModelError> {
    if object_points.is_empty() {
        return Ok(0.0);
    }

    let projected = camera.project_points(object_points, &pose.rvec, &pose.tvec)?;
    let squared_sum: f64 = projected
        .iter()
        .zip(image_points.iter())
        .map(|(p, q)| (p - q).norm_squared())
        .sum();

    Ok((squared_sum / projected.len() as f64).sqrt())
}
