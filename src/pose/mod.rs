//! Quantities derived from a solved pose.
//!
//! Rotations are carried around as rotation vectors (axis times angle, the
//! representation OpenCV calls `rvec`).

pub mod persistence;

pub use persistence::{load_pnp_result, save_pnp_result};

use nalgebra::{Matrix3, RealField, Vector3};

const SMALL_ANGLE_SQUARED: f64 = 1e-12;

/// Converts a rotation vector into its 3x3 rotation matrix (Rodrigues' formula).
///
/// For `θ² < 1e-12` the first-order expansion `I + [r]×` is used.
///
/// # Examples
///
/// ```rust
/// use nalgebra::{Matrix3, Vector3};
/// use paper_pnp::pose::rotation_matrix;
///
/// let r = rotation_matrix(&Vector3::zeros());
/// assert_eq!(r, Matrix3::identity());
///
/// let quarter_turn = rotation_matrix(&Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2));
/// let x = quarter_turn * Vector3::x();
/// assert!((x - Vector3::y()).norm() < 1e-12);
/// ```
pub fn rotation_matrix(rvec: &Vector3<f64>) -> Matrix3<f64> {
    let theta2 = rvec.norm_squared();
    if theta2 < SMALL_ANGLE_SQUARED {
        return Matrix3::identity() + rvec.cross_matrix();
    }

    let theta = theta2.sqrt();
    let k = rvec.cross_matrix() / theta;
    Matrix3::identity() + k * theta.sin() + k * k * (1.0 - theta.cos())
}

/// Rotates `point` by the rotation vector `rvec` without forming the matrix.
///
/// Generic over the scalar so it can be evaluated on dual numbers during
/// optimization.
pub fn rotate_point<T: RealField>(rvec: &Vector3<T>, point: &Vector3<T>) -> Vector3<T> {
    let small_angle: T = nalgebra::convert(SMALL_ANGLE_SQUARED);
    let theta2 = rvec.norm_squared();
    let w_cross_p = rvec.cross(point);

    if theta2 < small_angle {
        return point.clone() + w_cross_p;
    }

    let theta = theta2.clone().sqrt();
    let cos_theta = theta.clone().cos();
    let sin_theta = theta.clone().sin();
    let w_dot_p = rvec.dot(point);

    point.clone() * cos_theta.clone()
        + w_cross_p * (sin_theta / theta)
        + rvec.clone() * (w_dot_p * (T::one() - cos_theta) / theta2)
}

/// Position of the camera center in the world frame, `Rᵀ·(−t)`.
///
/// # Examples
///
/// ```rust
/// use nalgebra::Vector3;
/// use paper_pnp::pose::camera_position;
///
/// let position = camera_position(&Vector3::zeros(), &Vector3::new(0.0, 0.0, 1.0));
/// assert_eq!(position, Vector3::new(0.0, 0.0, -1.0));
/// ```
pub fn camera_position(rvec: &Vector3<f64>, tvec: &Vector3<f64>) -> Vector3<f64> {
    rotation_matrix(rvec).transpose() * (-tvec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;
    use std::f64::consts::PI;

    fn sample_rvecs() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(0.1, -0.2, 0.3),
            Vector3::new(1.2, 0.4, -0.7),
            Vector3::new(0.0, 0.0, PI - 1e-3),
            Vector3::new(-2.0, 1.0, 0.5),
            Vector3::new(1e-8, -2e-8, 0.0),
        ]
    }

    #[test]
    fn test_rotation_matrix_zero_is_identity() {
        assert_eq!(rotation_matrix(&Vector3::zeros()), Matrix3::identity());
    }

    #[test]
    fn test_rotation_matrix_is_orthonormal() {
        for rvec in sample_rvecs() {
            let r = rotation_matrix(&rvec);
            assert_relative_eq!(r.transpose() * r, Matrix3::identity(), epsilon = 1e-12);
            assert_relative_eq!(r.determinant(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotation_matrix_matches_axis_angle() {
        for rvec in sample_rvecs() {
            let expected = Rotation3::from_scaled_axis(rvec);
            assert_relative_eq!(rotation_matrix(&rvec), *expected.matrix(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotate_point_matches_matrix() {
        let point = Vector3::new(0.21, 0.297, 0.0);
        for rvec in sample_rvecs() {
            let rotated = rotate_point(&rvec, &point);
            assert_relative_eq!(rotated, rotation_matrix(&rvec) * point, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_camera_position() {
        assert_eq!(
            camera_position(&Vector3::zeros(), &Vector3::new(0.0, 0.0, 1.0)),
            Vector3::new(0.0, 0.0, -1.0)
        );

        // The camera center maps to the origin of the camera frame.
        let rvec = Vector3::new(0.3, -0.4, 0.2);
        let tvec = Vector3::new(-0.1, 0.05, 0.8);
        let center = camera_position(&rvec, &tvec);
        assert_relative_eq!(
            rotation_matrix(&rvec) * center + tvec,
            Vector3::zeros(),
            epsilon = 1e-12
        );
    }
}
