//! Reading and writing RGB images.

use image::{ImageError, RgbImage};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ImageDecodeError {
    /// No decoder exists for the file format.
    #[error("Image format is not supported: {0}")]
    UnsupportedFormat(String),
    /// The file cannot be read or its content cannot be decoded.
    #[error("Image could not be loaded: {0}")]
    Corrupt(String),
}

#[derive(thiserror::Error, Debug)]
#[error("Failed to save image to {path}: {reason}")]
pub struct ImageEncodeError {
    pub path: String,
    pub reason: String,
}

/// Loads an image from disk and converts it to 8-bit RGB.
///
/// The format is picked from the file extension.
///
/// # Errors
///
/// * [`ImageDecodeError::UnsupportedFormat`] if no decoder handles the format.
/// * [`ImageDecodeError::Corrupt`] if the file is missing, unreadable or not a valid image.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage, ImageDecodeError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|e| match e {
        ImageError::Unsupported(err) => {
            ImageDecodeError::UnsupportedFormat(format!("{}: {err}", path.display()))
        }
        other => ImageDecodeError::Corrupt(format!("{}: {other}", path.display())),
    })?;

    Ok(img.to_rgb8())
}

/// Saves an image, encoding it according to the file extension.
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<(), ImageEncodeError> {
    let path = path.as_ref();
    image.save(path).map_err(|e| ImageEncodeError {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::fs;

    #[test]
    fn test_save_and_load_png() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/imageio_roundtrip.png";

        let mut image = RgbImage::new(8, 6);
        image.put_pixel(3, 2, Rgb([255, 0, 0]));
        image.put_pixel(7, 5, Rgb([0, 128, 255]));

        save_image(&image, path).unwrap();
        let loaded = load_image(path).unwrap();

        assert_eq!(loaded.dimensions(), (8, 6));
        assert_eq!(loaded.get_pixel(3, 2), &Rgb([255, 0, 0]));
        assert_eq!(loaded.get_pixel(7, 5), &Rgb([0, 128, 255]));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_missing_image() {
        assert!(matches!(
            load_image("/nonexistent/path/calibration.png"),
            Err(ImageDecodeError::Corrupt(_))
        ));
    }

    #[test]
    fn test_load_undecodable_image() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/imageio_garbage.png";
        fs::write(path, b"definitely not a png").unwrap();

        assert!(matches!(load_image(path), Err(ImageDecodeError::Corrupt(_))));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_unsupported_format() {
        fs::create_dir_all("output").expect("Failed to create output directory for test.");
        let path = "output/imageio_unknown.xyz";
        fs::write(path, b"unknown").unwrap();

        assert!(matches!(
            load_image(path),
            Err(ImageDecodeError::UnsupportedFormat(_))
        ));

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_save_to_missing_directory() {
        let image = RgbImage::new(2, 2);
        assert!(save_image(&image, "/nonexistent/path/out.png").is_err());
    }
}
