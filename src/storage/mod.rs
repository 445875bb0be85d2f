//! Keyed document storage shared by the camera and pose files.
//!
//! Every persisted value in this crate (camera intrinsics, distortion
//! coefficients, PnP results) is a small key/value document. Documents are
//! written as pretty-printed JSON when the path ends in `.json` and as YAML
//! otherwise. They are always read back through `yaml_rust`, which accepts
//! both syntaxes since JSON is a subset of YAML 1.2.
//!
//! Files produced by OpenCV's `cv::FileStorage` start with a `%YAML:1.0`
//! directive that is not valid YAML 1.2; it is skipped before parsing so those
//! files load as well.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use yaml_rust::{Yaml, YamlLoader};

/// Errors raised while reading or writing keyed documents.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The file is missing or cannot be read.
    #[error("Could not open {path}: {reason}")]
    FileAccess { path: String, reason: String },
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("Failed to write JSON: {0}")]
    JsonError(String),
    #[error("IO Error: {0}")]
    IOError(String),
    #[error("Missing field '{0}'")]
    MissingField(String),
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl From<yaml_rust::ScanError> for StorageError {
    fn from(err: yaml_rust::ScanError) -> Self {
        StorageError::YamlError(err.to_string())
    }
}

impl From<serde_yaml::Error> for StorageError {
    fn from(err: serde_yaml::Error) -> Self {
        StorageError::YamlError(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::JsonError(err.to_string())
    }
}

/// On-disk syntax of a keyed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Picks the format from the file extension (`.json` is JSON, anything else YAML).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// A matrix entry laid out the way OpenCV writes `cv::Mat` values.
///
/// `data` is stored row-major, `dt` is the OpenCV element type code (`d` for
/// `f64`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub type_id: String,
    pub rows: usize,
    pub cols: usize,
    pub dt: String,
    pub data: Vec<f64>,
}

impl MatrixEntry {
    /// Builds a `n x 1` column matrix entry.
    pub fn column(values: &[f64]) -> Self {
        MatrixEntry {
            type_id: "opencv-matrix".to_string(),
            rows: values.len(),
            cols: 1,
            dt: "d".to_string(),
            data: values.to_vec(),
        }
    }
}

/// Reads and parses the document stored at `path`.
///
/// # Errors
///
/// * [`StorageError::FileAccess`] if the file cannot be opened or read.
/// * [`StorageError::YamlError`] if the content is not valid YAML/JSON or is empty.
pub fn read_document<P: AsRef<Path>>(path: P) -> Result<Yaml, StorageError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| StorageError::FileAccess {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut docs = YamlLoader::load_from_str(strip_opencv_directive(&contents))?;
    if docs.is_empty() {
        return Err(StorageError::YamlError(format!(
            "Empty document in {}",
            path.display()
        )));
    }

    Ok(docs.swap_remove(0))
}

/// Serializes `value` and writes it to `path`, as JSON or YAML depending on the extension.
pub fn write_document<P, T>(path: P, value: &T) -> Result<(), StorageError>
where
    P: AsRef<Path>,
    T: Serialize,
{
    let path = path.as_ref();
    let text = match DocumentFormat::from_path(path) {
        DocumentFormat::Json => serde_json::to_string_pretty(value)?,
        DocumentFormat::Yaml => serde_yaml::to_string(value)?,
    };

    fs::write(path, text)
        .map_err(|e| StorageError::IOError(format!("{}: {}", path.display(), e)))?;

    Ok(())
}

/// Reads the real number stored under `key`. Integer values are accepted.
pub fn read_real(doc: &Yaml, key: &str) -> Result<f64, StorageError> {
    match &doc[key] {
        Yaml::BadValue => Err(StorageError::MissingField(key.to_string())),
        node => as_real(node).ok_or_else(|| StorageError::InvalidField {
            field: key.to_string(),
            reason: "expected a number".to_string(),
        }),
    }
}

/// Reads the matrix stored under `key`.
///
/// Both the OpenCV mapping layout (`rows`, `cols`, `data`) and a plain list
/// of numbers (read as a column) are accepted. The shape itself is not
/// checked against any expectation here.
pub fn read_matrix(doc: &Yaml, key: &str) -> Result<DMatrix<f64>, StorageError> {
    let invalid = |reason: &str| StorageError::InvalidField {
        field: key.to_string(),
        reason: reason.to_string(),
    };

    let node = &doc[key];
    match node {
        Yaml::BadValue => Err(StorageError::MissingField(key.to_string())),
        Yaml::Array(items) => {
            let data = reals(items).ok_or_else(|| invalid("matrix data must be numeric"))?;
            Ok(DMatrix::from_column_slice(data.len(), 1, &data))
        }
        Yaml::Hash(_) => {
            let rows = node["rows"]
                .as_i64()
                .ok_or_else(|| invalid("missing or invalid 'rows'"))?;
            let cols = node["cols"]
                .as_i64()
                .ok_or_else(|| invalid("missing or invalid 'cols'"))?;
            let items = node["data"]
                .as_vec()
                .ok_or_else(|| invalid("missing 'data'"))?;
            let data = reals(items).ok_or_else(|| invalid("matrix data must be numeric"))?;

            let shape = usize::try_from(rows)
                .ok()
                .zip(usize::try_from(cols).ok())
                .filter(|(r, c)| r.checked_mul(*c) == Some(data.len()));
            let Some((rows, cols)) = shape else {
                return Err(invalid(&format!(
                    "{}x{} matrix with {} values",
                    rows,
                    cols,
                    data.len()
                )));
            };

            Ok(DMatrix::from_row_slice(rows, cols, &data))
        }
        _ => Err(invalid("expected a matrix")),
    }
}

fn as_real(node: &Yaml) -> Option<f64> {
    match node {
        Yaml::Integer(value) => Some(*value as f64),
        other => other.as_f64(),
    }
}

fn reals(items: &[Yaml]) -> Option<Vec<f64>> {
    items.iter().map(as_real).collect()
}

fn strip_opencv_directive(contents: &str) -> &str {
    let trimmed = contents.trim_start();
    if trimmed.starts_with("%YAML:") {
        match trimmed.find('\n') {
            Some(end) => &trimmed[end + 1..],
            None => "",
        }
    } else {
        contents
    }
}
