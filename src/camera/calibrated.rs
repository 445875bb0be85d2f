//! A calibrated camera: pinhole intrinsics followed by lens distortion.

use crate::camera::distortion::DistortionCoefficients;
use crate::camera::{validation, CameraModel, CameraModelError, Intrinsics};
use crate::pose::rotation_matrix;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Intrinsics and distortion of a single camera.
///
/// # Examples
///
/// ```rust
/// use nalgebra::Vector3;
/// use paper_pnp::camera::{CalibratedCamera, CameraModel, DistortionCoefficients, Intrinsics};
///
/// let camera = CalibratedCamera::new(
///     Intrinsics::new(800.0, 800.0, 320.0, 240.0),
///     DistortionCoefficients::default(),
/// );
/// let pixel = camera.project(&Vector3::new(0.1, -0.05, 1.0)).unwrap();
/// assert_eq!(pixel.x, 400.0);
/// assert_eq!(pixel.y, 200.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedCamera {
    pub intrinsics: Intrinsics,
    pub distortion: DistortionCoefficients,
}

impl CalibratedCamera {
    /// Combines intrinsics and distortion into one camera.
    pub fn new(intrinsics: Intrinsics, distortion: DistortionCoefficients) -> Self {
        CalibratedCamera {
            intrinsics,
            distortion,
        }
    }

    /// Maps a pixel to undistorted normalized image coordinates (`K⁻¹`, then inverse distortion).
    ///
    /// # Errors
    ///
    /// [`CameraModelError::NumericalError`] if the intrinsics are singular or
    /// the undistortion diverges.
    pub fn normalize(&self, pixel: &Vector2<f64>) -> Result<Vector2<f64>, CameraModelError> {
        let distorted = Vector2::new(
            (pixel.x - self.intrinsics.cx) / self.intrinsics.fx,
            (pixel.y - self.intrinsics.cy) / self.intrinsics.fy,
        );
        if !distorted.x.is_finite() || !distorted.y.is_finite() {
            return Err(CameraModelError::NumericalError(format!(
                "Pixel ({}, {}) has no finite normalized coordinates",
                pixel.x, pixel.y
            )));
        }

        self.distortion.undistort(&distorted)
    }

    /// Projects world points seen from the pose `(rvec, tvec)`.
    ///
    /// Each point is moved to the camera frame with `R(rvec)·p + tvec` and
    /// projected with distortion.
    ///
    /// # Errors
    ///
    /// [`CameraModelError::PointAtCameraCenter`] if a point ends up at or
    /// behind the camera center.
    pub fn project_points(
        &self,
        points: &[Point3<f64>],
        rvec: &Vector3<f64>,
        tvec: &Vector3<f64>,
    ) -> Result<Vec<Point2<f64>>, CameraModelError> {
        let rotation = rotation_matrix(rvec);

        points
            .iter()
            .map(|p| {
                let in_camera = rotation * p.coords + tvec;
                self.project(&in_camera).map(Point2::from)
            })
            .collect()
    }
}

impl CameraModel for CalibratedCamera {
    fn project(&self, point_3d: &Vector3<f64>) -> Result<Vector2<f64>, CameraModelError> {
        if point_3d.z < f64::EPSILON.sqrt() {
            return Err(CameraModelError::PointAtCameraCenter);
        }

        let (x_distorted, y_distorted) = self
            .distortion
            .distort(point_3d.x / point_3d.z, point_3d.y / point_3d.z);

        Ok(Vector2::new(
            self.intrinsics.fx * x_distorted + self.intrinsics.cx,
            self.intrinsics.fy * y_distorted + self.intrinsics.cy,
        ))
    }

    fn unproject(&self, point_2d: &Vector2<f64>) -> Result<Vector3<f64>, CameraModelError> {
        let normalized = self.normalize(point_2d)?;
        Ok(Vector3::new(normalized.x, normalized.y, 1.0).normalize())
    }

    fn validate_params(&self) -> Result<(), CameraModelError> {
        validation::validate_intrinsics(&self.intrinsics)?;

        if self.distortion.to_array().iter().any(|k| !k.is_finite()) {
            return Err(CameraModelError::InvalidParams(
                "Distortion coefficients must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn distorted_camera() -> CalibratedCamera {
        CalibratedCamera::new(
            Intrinsics::new(1010.5, 1012.25, 640.0, 360.0),
            DistortionCoefficients {
                k1: -0.28,
                k2: 0.07,
                p1: 0.0002,
                p2: 0.00002,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_project_without_distortion() {
        let camera = CalibratedCamera::new(
            Intrinsics::new(800.0, 800.0, 320.0, 240.0),
            DistortionCoefficients::default(),
        );
        let pixel = camera.project(&Vector3::new(0.2, 0.3, 2.0)).unwrap();
        assert_relative_eq!(pixel.x, 400.0);
        assert_relative_eq!(pixel.y, 360.0);
    }

    #[test]
    fn test_project_rejects_points_behind_camera() {
        let camera = distorted_camera();
        assert!(matches!(
            camera.project(&Vector3::new(0.1, 0.1, 0.0)),
            Err(CameraModelError::PointAtCameraCenter)
        ));
        assert!(matches!(
            camera.project(&Vector3::new(0.1, 0.1, -1.0)),
            Err(CameraModelError::PointAtCameraCenter)
        ));
    }

    #[test]
    fn test_project_unproject_consistency() {
        let camera = distorted_camera();
        let point_3d = Vector3::new(0.25, -0.1, 1.5);

        let pixel = camera.project(&point_3d).unwrap();
        let ray = camera.unproject(&pixel).unwrap();

        assert_relative_eq!(ray.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(ray, point_3d.normalize(), epsilon = 1e-9);
    }

    #[test]
    fn test_normalize_singular_intrinsics() {
        let camera = CalibratedCamera::new(
            Intrinsics::new(0.0, 800.0, 320.0, 240.0),
            DistortionCoefficients::default(),
        );
        assert!(camera.normalize(&Vector2::new(100.0, 100.0)).is_err());
    }

    #[test]
    fn test_project_points_with_pose() {
        let camera = CalibratedCamera::new(
            Intrinsics::new(800.0, 800.0, 320.0, 240.0),
            DistortionCoefficients::default(),
        );
        let points = [Point3::origin(), Point3::new(0.1, 0.0, 0.0)];
        let projected = camera
            .project_points(&points, &Vector3::zeros(), &Vector3::new(0.0, 0.0, 1.0))
            .unwrap();

        assert_relative_eq!(projected[0], Point2::new(320.0, 240.0));
        assert_relative_eq!(projected[1], Point2::new(400.0, 240.0));
    }

    #[test]
    fn test_validate_params() {
        assert!(distorted_camera().validate_params().is_ok());

        let mut camera = distorted_camera();
        camera.distortion.k5 = f64::NAN;
        assert!(matches!(
            camera.validate_params(),
            Err(CameraModelError::InvalidParams(_))
        ));

        camera.intrinsics.fx = -1.0;
        assert!(matches!(
            camera.validate_params(),
            Err(CameraModelError::FocalLengthMustBePositive)
        ));
    }
}
