//! Rational radial + tangential lens distortion.
//!
//! For a point `(x, y)` on the normalized image plane and `r² = x² + y²`:
//!
//! ```text
//! radial = (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
//! x_d = x·radial + 2 p1 x y + p2 (r² + 2x²)
//! y_d = y·radial + p1 (r² + 2y²) + 2 p2 x y
//! ```
//!
//! With `k4 = k5 = k6 = 0` this reduces to the classic 5-coefficient
//! radial-tangential model.

use crate::camera::CameraModelError;
use crate::storage::{self, StorageError};
use nalgebra::{RealField, Vector2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The eight distortion coefficients. All zeros means no distortion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DistortionCoefficients {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
}

impl DistortionCoefficients {
    /// Builds the coefficients from `[k1, k2, p1, p2, k3, k4, k5, k6]`.
    pub fn from_array(values: [f64; 8]) -> Self {
        let [k1, k2, p1, p2, k3, k4, k5, k6] = values;
        DistortionCoefficients {
            k1,
            k2,
            p1,
            p2,
            k3,
            k4,
            k5,
            k6,
        }
    }

    /// Returns `[k1, k2, p1, p2, k3, k4, k5, k6]`.
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.k1, self.k2, self.p1, self.p2, self.k3, self.k4, self.k5, self.k6,
        ]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&k| k == 0.0)
    }

    /// Applies the distortion to a normalized point.
    ///
    /// Generic over the scalar so the same model runs on `f64` and on the
    /// dual numbers used by the pose optimizer.
    pub fn distort<T: RealField>(&self, x: T, y: T) -> (T, T) {
        let k1: T = nalgebra::convert(self.k1);
        let k2: T = nalgebra::convert(self.k2);
        let k3: T = nalgebra::convert(self.k3);
        let k4: T = nalgebra::convert(self.k4);
        let k5: T = nalgebra::convert(self.k5);
        let k6: T = nalgebra::convert(self.k6);
        let p1: T = nalgebra::convert(self.p1);
        let p2: T = nalgebra::convert(self.p2);
        let one = T::one();
        let two: T = nalgebra::convert(2.0);

        let r2 = x.clone() * x.clone() + y.clone() * y.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();

        let numerator = one.clone() + k1 * r2.clone() + k2 * r4.clone() + k3 * r6.clone();
        let denominator = one + k4 * r2.clone() + k5 * r4 + k6 * r6;
        let radial = numerator / denominator;

        let xy = x.clone() * y.clone();
        let x_distorted = x.clone() * radial.clone()
            + two.clone() * p1.clone() * xy.clone()
            + p2.clone() * (r2.clone() + two.clone() * x.clone() * x);
        let y_distorted = y.clone() * radial
            + p1 * (r2 + two.clone() * y.clone() * y)
            + two * p2 * xy;

        (x_distorted, y_distorted)
    }

    /// Removes the distortion from a normalized point.
    ///
    /// Fixed-point iteration: the tangential terms are subtracted and the
    /// radial factor inverted at the current estimate, starting from the
    /// distorted point itself. Stops after 20 iterations or once the update
    /// falls below `1e-12`.
    ///
    /// # Errors
    ///
    /// [`CameraModelError::NumericalError`] if the iteration produces non-finite values.
    pub fn undistort(&self, distorted: &Vector2<f64>) -> Result<Vector2<f64>, CameraModelError> {
        const EPS: f64 = 1e-12;
        const MAX_ITERATIONS: u32 = 20;

        if !distorted.x.is_finite() || !distorted.y.is_finite() {
            return Err(CameraModelError::NumericalError(format!(
                "Cannot undistort non-finite point ({}, {})",
                distorted.x, distorted.y
            )));
        }
        if self.is_zero() {
            return Ok(*distorted);
        }

        let mut point = *distorted;
        for _ in 0..MAX_ITERATIONS {
            let (x, y) = (point.x, point.y);
            let r2 = x * x + y * y;
            let r4 = r2 * r2;
            let r6 = r4 * r2;

            let inverse_radial = (1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6)
                / (1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6);
            let delta_x = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let delta_y = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

            let next = Vector2::new(
                (distorted.x - delta_x) * inverse_radial,
                (distorted.y - delta_y) * inverse_radial,
            );
            if !next.x.is_finite() || !next.y.is_finite() {
                return Err(CameraModelError::NumericalError(
                    "Undistortion diverged".to_string(),
                ));
            }

            let step = (next - point).norm();
            point = next;
            if step < EPS {
                break;
            }
        }

        Ok(point)
    }
}

/// Flattens the coefficients in the order `[k1, k2, p1, p2, k3, k4, k5, k6]`.
pub fn distortion_vector(coefficients: &DistortionCoefficients) -> [f64; 8] {
    coefficients.to_array()
}

/// Loads distortion coefficients from a keyed document holding `k1`..`k6`, `p1` and `p2`.
///
/// # Errors
///
/// * [`StorageError::FileAccess`] if the file cannot be opened.
/// * [`StorageError::MissingField`] if one of the eight keys is absent.
pub fn load_distortion_coeffs<P: AsRef<Path>>(
    path: P,
) -> Result<DistortionCoefficients, StorageError> {
    let doc = storage::read_document(path)?;

    Ok(DistortionCoefficients {
        k1: storage::read_real(&doc, "k1")?,
        k2: storage::read_real(&doc, "k2")?,
        p1: storage::read_real(&doc, "p1")?,
        p2: storage::read_real(&doc, "p2")?,
        k3: storage::read_real(&doc, "k3")?,
        k4: storage::read_real(&doc, "k4")?,
        k5: storage::read_real(&doc, "k5")?,
        k6: storage::read_real(&doc, "k6")?,
    })
}

/// Saves distortion coefficients under the keys `k1`..`k6`, `p1` and `p2`.
///
/// # Arguments
///
/// * `path` - Destination file; `.json` is written as JSON, anything else as YAML.
/// * `coefficients` - The coefficients to store.
///
/// # Return Value
///
/// `Ok(())` on success, [`StorageError::IOError`] if the file cannot be
/// written, or a serialization error.
pub fn save_distortion_coeffs<P: AsRef<Path>>(
    path: P,
    coefficients: &DistortionCoefficients,
) -> Result<(), StorageError> {
    storage::write_document(path, coefficients)
}
