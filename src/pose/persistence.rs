//! Saving and loading solved poses.
//!
//! A pose file holds two keyed matrix entries, `rvec` and `tvec`, each a 3x1
//! matrix in the layout written by OpenCV's `FileStorage`:
//!
//! ```json
//! {
//!   "rvec": { "type_id": "opencv-matrix", "rows": 3, "cols": 1, "dt": "d", "data": [0.0, 0.0, 0.0] },
//!   "tvec": { "type_id": "opencv-matrix", "rows": 3, "cols": 1, "dt": "d", "data": [0.0, 0.0, 1.0] }
//! }
//! ```

use crate::pnp::PnpResult;
use crate::storage::{self, MatrixEntry, StorageError};
use nalgebra::Vector3;
use serde::Serialize;
use std::path::Path;
use yaml_rust::Yaml;

#[derive(Serialize)]
struct PoseDocument {
    rvec: MatrixEntry,
    tvec: MatrixEntry,
}

/// Writes `result` to `path` (JSON for `.json`, YAML otherwise).
pub fn save_pnp_result<P: AsRef<Path>>(path: P, result: &PnpResult) -> Result<(), StorageError> {
    let document = PoseDocument {
        rvec: MatrixEntry::column(result.rvec.as_slice()),
        tvec: MatrixEntry::column(result.tvec.as_slice()),
    };
    storage::write_document(path, &document)
}

/// Reads a pose written by [`save_pnp_result`] or by OpenCV.
///
/// # Errors
///
/// * [`StorageError::FileAccess`] if the file cannot be opened.
/// * [`StorageError::MissingField`] if `rvec` or `tvec` is absent.
/// * [`StorageError::InvalidField`] if an entry does not hold exactly three
///   values as a 3x1 or 1x3 matrix.
pub fn load_pnp_result<P: AsRef<Path>>(path: P) -> Result<PnpResult, StorageError> {
    let doc = storage::read_document(path)?;

    Ok(PnpResult {
        rvec: read_vector3(&doc, "rvec")?,
        tvec: read_vector3(&doc, "tvec")?,
    })
}

fn read_vector3(doc: &Yaml, key: &str) -> Result<Vector3<f64>, StorageError> {
    let matrix = storage::read_matrix(doc, key)?;

    if matrix.len() != 3 || (matrix.nrows() != 1 && matrix.ncols() != 1) {
        return Err(StorageError::InvalidField {
            field: key.to_string(),
            reason: format!(
                "expected a 3x1 matrix, found {}x{}",
                matrix.nrows(),
                matrix.ncols()
            ),
        });
    }

    Ok(Vector3::new(matrix[0], matrix[1], matrix[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn sample_result() -> PnpResult {
        PnpResult {
            rvec: Vector3::new(0.123456789, -0.987654321, 0.5),
            tvec: Vector3::new(-0.105, -0.1485, 1.0),
        }
    }

    #[test]
    fn test_save_and_load_json() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/pnpresult_roundtrip.json";

        save_pnp_result(path, &sample_result()).unwrap();
        let loaded = load_pnp_result(path).unwrap();
        assert_relative_eq!(loaded.rvec, sample_result().rvec, epsilon = 1e-9);
        assert_relative_eq!(loaded.tvec, sample_result().tvec, epsilon = 1e-9);

        // The entries keep the OpenCV matrix layout.
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("opencv-matrix"));
        assert!(text.contains("\"rows\": 3"));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_save_and_load_yaml() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/pnpresult_roundtrip.yaml";

        save_pnp_result(path, &sample_result()).unwrap();
        let loaded = load_pnp_result(path).unwrap();
        assert_eq!(loaded, sample_result());

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_sample_result() {
        let loaded = load_pnp_result("samples/pnpresult.json").unwrap();
        assert_relative_eq!(loaded.rvec, Vector3::new(0.05, -0.02, 0.01));
        assert_relative_eq!(loaded.tvec, Vector3::new(-0.105, -0.1485, 1.0));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_pnp_result("/nonexistent/path/pnpresult.json"),
            Err(StorageError::FileAccess { .. })
        ));
    }

    #[test]
    fn test_load_rejects_wrong_shape() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/pnpresult_wrong_shape.json";
        fs::write(
            path,
            r#"{
  "rvec": { "type_id": "opencv-matrix", "rows": 2, "cols": 2, "dt": "d", "data": [1, 0, 0, 1] },
  "tvec": { "type_id": "opencv-matrix", "rows": 1, "cols": 3, "dt": "d", "data": [0, 0, 1] }
}"#,
        )
        .unwrap();

        let result = load_pnp_result(path);
        assert!(matches!(
            result,
            Err(StorageError::InvalidField { ref field, .. }) if field == "rvec"
        ));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_rejects_overflowing_shape() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/pnpresult_overflow.yaml";
        fs::write(
            path,
            "rvec: {rows: 4611686018427387904, cols: 4, data: []}\ntvec: [0, 0, 1]\n",
        )
        .unwrap();

        assert!(matches!(
            load_pnp_result(path),
            Err(StorageError::InvalidField { ref field, .. }) if field == "rvec"
        ));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_row_vector() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/pnpresult_row_vector.yaml";
        fs::write(
            path,
            "%YAML:1.0\n---\nrvec: !!opencv-matrix\n   rows: 1\n   cols: 3\n   dt: d\n   data: [ 0.1, 0.2, 0.3 ]\ntvec: !!opencv-matrix\n   rows: 3\n   cols: 1\n   dt: d\n   data: [ 1, 2, 3 ]\n",
        )
        .unwrap();

        let loaded = load_pnp_result(path).unwrap();
        assert_eq!(loaded.rvec, Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(loaded.tvec, Vector3::new(1.0, 2.0, 3.0));

        fs::remove_file(path).unwrap();
    }
}
