//! Non-linear pose refinement.
//!
//! Minimizes the pixel reprojection error of the correspondences over the
//! six pose parameters `[rx, ry, rz, tx, ty, tz]` with the Levenberg-Marquardt
//! optimizer of `tiny_solver`. The full distortion model is part of the
//! residual, so the linear estimate (computed on undistorted coordinates) is
//! corrected for any residual mismatch.

use crate::camera::{CalibratedCamera, DistortionCoefficients, Intrinsics};
use crate::pnp::{PnpResult, PoseSolveError};
use crate::pose::rotate_point;

use log::debug;
use nalgebra::{DVector, Point2, Point3, Vector2, Vector3};
use std::collections::HashMap;
use tiny_solver::factors::Factor;
use tiny_solver::{LevenbergMarquardtOptimizer, Optimizer as TinySolverOptimizer};

const POSE_VARIABLE: &str = "pose";

/// Residual returned for a point that falls behind the camera.
const BEHIND_CAMERA_RESIDUAL: f64 = 1e6;

/// Reprojection residuals of world points observed by a calibrated camera.
#[derive(Debug, Clone)]
struct PoseReprojectionCost {
    object_points: Vec<Vector3<f64>>,
    image_points: Vec<Vector2<f64>>,
    intrinsics: Intrinsics,
    distortion: DistortionCoefficients,
}

impl PoseReprojectionCost {
    fn new(
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        camera: &CalibratedCamera,
    ) -> Self {
        Self {
            object_points: object_points.iter().map(|p| p.coords).collect(),
            image_points: image_points.iter().map(|p| p.coords).collect(),
            intrinsics: camera.intrinsics,
            distortion: camera.distortion,
        }
    }
}

impl<T: nalgebra::RealField> Factor<T> for PoseReprojectionCost {
    fn residual_func(&self, params: &[DVector<T>]) -> DVector<T> {
        let pose = &params[0];
        let rvec = Vector3::new(pose[0].clone(), pose[1].clone(), pose[2].clone());
        let tvec = Vector3::new(pose[3].clone(), pose[4].clone(), pose[5].clone());

        let fx: T = nalgebra::convert(self.intrinsics.fx);
        let fy: T = nalgebra::convert(self.intrinsics.fy);
        let cx: T = nalgebra::convert(self.intrinsics.cx);
        let cy: T = nalgebra::convert(self.intrinsics.cy);
        let min_depth: T = nalgebra::convert(f64::EPSILON.sqrt());

        let mut residuals = DVector::zeros(self.image_points.len() * 2);

        for (i, (p3d, p2d)) in self
            .object_points
            .iter()
            .zip(self.image_points.iter())
            .enumerate()
        {
            let world: Vector3<T> = Vector3::new(
                nalgebra::convert(p3d.x),
                nalgebra::convert(p3d.y),
                nalgebra::convert(p3d.z),
            );
            let in_camera = rotate_point(&rvec, &world) + tvec.clone();

            if in_camera.z < min_depth {
                residuals[i * 2] = nalgebra::convert(BEHIND_CAMERA_RESIDUAL);
                residuals[i * 2 + 1] = nalgebra::convert(BEHIND_CAMERA_RESIDUAL);
                continue;
            }

            let x = in_camera.x.clone() / in_camera.z.clone();
            let y = in_camera.y.clone() / in_camera.z.clone();
            let (x_distorted, y_distorted) = self.distortion.distort(x, y);

            let u = fx.clone() * x_distorted + cx.clone();
            let v = fy.clone() * y_distorted + cy.clone();
            let gt_u: T = nalgebra::convert(p2d.x);
            let gt_v: T = nalgebra::convert(p2d.y);

            residuals[i * 2] = u - gt_u;
            residuals[i * 2 + 1] = v - gt_v;
        }
        residuals
    }
}

/// Refines `initial` by Levenberg-Marquardt on the reprojection error.
///
/// # Errors
///
/// [`PoseSolveError::NotConverged`] if the optimizer gives up or returns
/// non-finite parameters. The caller decides whether to fall back to
/// `initial`.
pub fn refine_pose_lm(
    object_points: &[Point3<f64>],
    image_points: &[Point2<f64>],
    camera: &CalibratedCamera,
    initial: &PnpResult,
) -> Result<PnpResult, PoseSolveError> {
    if object_points.len() != image_points.len() {
        return Err(PoseSolveError::MismatchedCorrespondences {
            object: object_points.len(),
            image: image_points.len(),
        });
    }

    let mut problem = tiny_solver::Problem::new();
    let cost_function = PoseReprojectionCost::new(object_points, image_points, camera);
    let num_residuals = image_points.len() * 2;
    problem.add_residual_block(
        num_residuals,
        &[POSE_VARIABLE],
        Box::new(cost_function),
        None,
    );

    let initial_params = DVector::from_vec(vec![
        initial.rvec.x,
        initial.rvec.y,
        initial.rvec.z,
        initial.tvec.x,
        initial.tvec.y,
        initial.tvec.z,
    ]);
    let mut initial_values = HashMap::new();
    initial_values.insert(POSE_VARIABLE.to_string(), initial_params);

    debug!(
        "Refining pose over {} correspondences with Levenberg-Marquardt",
        image_points.len()
    );

    let optimizer = LevenbergMarquardtOptimizer::default();
    let result = optimizer
        .optimize(&problem, &initial_values, None)
        .ok_or_else(|| PoseSolveError::NotConverged("Levenberg-Marquardt failed".to_string()))?;

    let pose = result.get(POSE_VARIABLE).ok_or_else(|| {
        PoseSolveError::NotConverged("optimizer returned no pose".to_string())
    })?;
    if pose.len() != 6 || pose.iter().any(|v| !v.is_finite()) {
        return Err(PoseSolveError::NotConverged(
            "optimizer returned a non-finite pose".to_string(),
        ));
    }

    Ok(PnpResult {
        rvec: Vector3::new(pose[0], pose[1], pose[2]),
        tvec: Vector3::new(pose[3], pose[4], pose[5]),
    })
}
