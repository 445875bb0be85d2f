//! Linear pose initialization for planar targets.
//!
//! The object plane (`z = 0`) is mapped to the normalized image plane by a
//! homography `H ~ [r1 r2 t]`, estimated with the normalized DLT and then
//! decomposed into a rotation and a translation.

use crate::pnp::PoseSolveError;
use nalgebra::{DMatrix, Matrix2, Matrix3, Point2, Rotation3, UnitQuaternion, Vector2, Vector3};

/// Minimum triangle area (in Hartley-normalized coordinates) spanned by any
/// three of four correspondences.
pub const MIN_TRIANGLE_AREA: f64 = 1e-9;

const MIN_SCATTER_EIGENVALUE: f64 = 1e-9;
const MIN_HOMOGRAPHY_DETERMINANT: f64 = 1e-9;

/// Hartley normalization: translate the centroid to the origin and scale so
/// the mean distance to it is `√2`.
///
/// Returns `None` when all points coincide.
pub fn normalize_points(points: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;

    let centroid = points
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords)
        / n;
    let mean_distance = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<f64>()
        / n;

    if !mean_distance.is_finite() || mean_distance < 1e-12 {
        return None;
    }

    let scale = std::f64::consts::SQRT_2 / mean_distance;
    let transform = Matrix3::new(
        scale, 0.0, -scale * centroid.x, //
        0.0, scale, -scale * centroid.y, //
        0.0, 0.0, 1.0,
    );
    let normalized = points
        .iter()
        .map(|p| Point2::from((p.coords - centroid) * scale))
        .collect();

    Some((normalized, transform))
}

/// Checks that normalized points are spread enough to define a homography.
///
/// All points on a line is always degenerate. With exactly four points, no
/// three of them may be collinear either.
fn check_configuration(normalized: &[Point2<f64>], role: &str) -> Result<(), PoseSolveError> {
    let n = normalized.len() as f64;
    let scatter = normalized
        .iter()
        .fold(Matrix2::zeros(), |acc, p| acc + p.coords * p.coords.transpose())
        / n;

    if scatter.symmetric_eigenvalues().min() < MIN_SCATTER_EIGENVALUE {
        return Err(PoseSolveError::DegenerateConfiguration(format!(
            "{} points are collinear",
            role
        )));
    }

    if normalized.len() == 4 {
        for skip in 0..4 {
            let triple: Vec<&Point2<f64>> = normalized
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, p)| p)
                .collect();
            let ab = triple[1] - triple[0];
            let ac = triple[2] - triple[0];
            let area = 0.5 * (ab.x * ac.y - ab.y * ac.x).abs();

            if area < MIN_TRIANGLE_AREA {
                return Err(PoseSolveError::DegenerateConfiguration(format!(
                    "three {} points are collinear",
                    role
                )));
            }
        }
    }

    Ok(())
}

/// Estimates the homography mapping `source` to `target` with the normalized DLT.
///
/// The result is scaled so that `H[(2, 2)] = 1` whenever that entry is not
/// close to zero.
///
/// # Errors
///
/// * [`PoseSolveError::InsufficientCorrespondences`] with fewer than four pairs.
/// * [`PoseSolveError::DegenerateConfiguration`] for coincident or collinear points.
/// * [`PoseSolveError::NumericalFailure`] if the SVD fails.
pub fn dlt_homography(
    source: &[Point2<f64>],
    target: &[Point2<f64>],
) -> Result<Matrix3<f64>, PoseSolveError> {
    if source.len() != target.len() {
        return Err(PoseSolveError::MismatchedCorrespondences {
            object: source.len(),
            image: target.len(),
        });
    }
    let n = source.len();
    if n < 4 {
        return Err(PoseSolveError::InsufficientCorrespondences {
            required: 4,
            actual: n,
        });
    }

    let (source_n, t_source) = normalize_points(source).ok_or_else(|| {
        PoseSolveError::DegenerateConfiguration("object points coincide".to_string())
    })?;
    let (target_n, t_target) = normalize_points(target).ok_or_else(|| {
        PoseSolveError::DegenerateConfiguration("image points coincide".to_string())
    })?;
    check_configuration(&source_n, "object")?;
    check_configuration(&target_n, "image")?;

    // Four correspondences give 8 equations; pad with a zero row so the SVD
    // returns a full 9x9 V.
    let mut a = DMatrix::<f64>::zeros((2 * n).max(9), 9);
    for (i, (s, t)) in source_n.iter().zip(target_n.iter()).enumerate() {
        let (x, y) = (s.x, s.y);
        let (u, v) = (t.x, t.y);
        let r0 = 2 * i;
        let r1 = r0 + 1;

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or_else(|| {
        PoseSolveError::NumericalFailure("SVD of the DLT system failed".to_string())
    })?;
    let (smallest, _) = svd.singular_values.argmin();
    let h = v_t.row(smallest);

    let h_normalized = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);
    if h_normalized.determinant().abs() < MIN_HOMOGRAPHY_DETERMINANT {
        return Err(PoseSolveError::DegenerateConfiguration(
            "homography is singular".to_string(),
        ));
    }

    let t_target_inv = t_target.try_inverse().ok_or_else(|| {
        PoseSolveError::NumericalFailure("normalization transform is singular".to_string())
    })?;
    let mut homography = t_target_inv * h_normalized * t_source;

    let h22 = homography[(2, 2)];
    if h22.abs() > 1e-12 {
        homography /= h22;
    }

    Ok(homography)
}

/// Recovers `(rvec, tvec)` from a homography between the object plane and the
/// normalized image plane.
///
/// The columns are scaled by the mean norm of the first two, the sign is
/// chosen so the target lies in front of the camera, and `[r1 r2 r1×r2]` is
/// projected onto SO(3).
pub fn pose_from_homography(
    homography: &Matrix3<f64>,
) -> Result<(Vector3<f64>, Vector3<f64>), PoseSolveError> {
    let h1 = homography.column(0).into_owned();
    let h2 = homography.column(1).into_owned();
    let h3 = homography.column(2).into_owned();

    let norm1 = h1.norm();
    let norm2 = h2.norm();
    if !(norm1 > 1e-12 && norm2 > 1e-12) {
        return Err(PoseSolveError::DegenerateConfiguration(
            "homography has a vanishing column".to_string(),
        ));
    }

    let mut lambda = 2.0 / (norm1 + norm2);
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let tvec = h3 * lambda;
    let r3 = r1.cross(&r2);

    let approx_rotation = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = approx_rotation.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| PoseSolveError::NumericalFailure("SVD of the rotation failed".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| PoseSolveError::NumericalFailure("SVD of the rotation failed".to_string()))?;

    let mut rotation = u * v_t;
    if rotation.determinant() < 0.0 {
        let mut u_fixed = u;
        u_fixed.column_mut(2).neg_mut();
        rotation = u_fixed * v_t;
    }

    // The quaternion log clamps the angle, unlike acos of the matrix trace.
    let rvec =
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation)).scaled_axis();
    if !rvec.iter().chain(tvec.iter()).all(|v| v.is_finite()) {
        return Err(PoseSolveError::NumericalFailure(
            "homography decomposition produced non-finite values".to_string(),
        ));
    }

    Ok((rvec, tvec))
}
