//! Drawing overlays onto RGB images.
//!
//! Lines are rasterized by stamping filled discs along the segment, which
//! gives round caps and joins for thick strokes. Pixels falling outside the
//! image are skipped.

use crate::camera::{CalibratedCamera, CameraModelError, DistortionCoefficients, Intrinsics};
use crate::pnp::PnpResult;
use image::{Rgb, RgbImage};
use nalgebra::{Point2, Point3};

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// Fills a disc of `radius` pixels around `center`.
pub fn draw_disc(image: &mut RgbImage, center: &Point2<f64>, radius: f64, color: Rgb<u8>) {
    let center_x = center.x.round() as i64;
    let center_y = center.y.round() as i64;
    let reach = radius.ceil() as i64;
    let (width, height) = (image.width() as i64, image.height() as i64);

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if ((dx * dx + dy * dy) as f64) > radius * radius {
                continue;
            }
            let x = center_x + dx;
            let y = center_y + dy;

            if x >= 0 && x < width && y >= 0 && y < height {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

/// Draws a straight segment `thickness` pixels wide.
///
/// Only the part of the segment within the image, grown by the stroke
/// radius, is rasterized.
pub fn draw_line(
    image: &mut RgbImage,
    from: &Point2<f64>,
    to: &Point2<f64>,
    color: Rgb<u8>,
    thickness: u32,
) {
    if !(from.coords.iter().chain(to.coords.iter())).all(|v| v.is_finite()) {
        return;
    }

    let radius = thickness.max(1) as f64 / 2.0;
    let reach = radius.ceil() + 1.0;
    let bounds = (
        -reach,
        -reach,
        image.width() as f64 - 1.0 + reach,
        image.height() as f64 - 1.0 + reach,
    );
    let Some((from, to)) = clip_segment(from, to, bounds) else {
        return;
    };

    let delta = to - from;
    let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0) as usize;

    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        draw_disc(image, &(from + delta * t), radius, color);
    }
}

/// Clips the segment `from`-`to` to the rectangle `(min_x, min_y, max_x, max_y)` (Liang-Barsky).
///
/// Returns `None` if no part of the segment lies inside.
fn clip_segment(
    from: &Point2<f64>,
    to: &Point2<f64>,
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<(Point2<f64>, Point2<f64>)> {
    let delta = to - from;
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;

    let edges = [
        (-delta.x, from.x - min_x),
        (delta.x, max_x - from.x),
        (-delta.y, from.y - min_y),
        (delta.y, max_y - from.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    Some((from + delta * t_enter, from + delta * t_exit))
}

/// Draws the closed outline through `points`, joining the last point back to the first.
///
/// Fewer than two points draw nothing.
pub fn draw_contour(image: &mut RgbImage, points: &[Point2<f64>], color: Rgb<u8>, thickness: u32) {
    if points.len() < 2 {
        return;
    }

    for (i, from) in points.iter().enumerate() {
        let to = &points[(i + 1) % points.len()];
        draw_line(image, from, to, color, thickness);
    }
}

/// Draws the world axes seen from `pose`: X in red, Y in green, Z in blue.
///
/// Each axis runs from the world origin to `length` units along it.
///
/// # Errors
///
/// [`CameraModelError::PointAtCameraCenter`] if the origin or an axis tip is
/// behind the camera; nothing is drawn in that case.
pub fn draw_frame_axes(
    image: &mut RgbImage,
    intrinsics: &Intrinsics,
    distortion: &DistortionCoefficients,
    pose: &PnpResult,
    length: f64,
    thickness: u32,
) -> Result<(), CameraModelError> {
    let camera = CalibratedCamera::new(*intrinsics, *distortion);
    let axes = [
        Point3::origin(),
        Point3::new(length, 0.0, 0.0),
        Point3::new(0.0, length, 0.0),
        Point3::new(0.0, 0.0, length),
    ];
    let projected = camera.project_points(&axes, &pose.rvec, &pose.tvec)?;

    let origin = &projected[0];
    draw_line(image, origin, &projected[1], RED, thickness);
    draw_line(image, origin, &projected[2], GREEN, thickness);
    draw_line(image, origin, &projected[3], BLUE, thickness);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    #[test]
    fn test_draw_disc_is_clipped() {
        let mut image = RgbImage::new(10, 10);
        draw_disc(&mut image, &Point2::new(0.0, 0.0), 3.0, RED);

        assert_eq!(image.get_pixel(0, 0), &RED);
        assert_eq!(image.get_pixel(3, 0), &RED);
        assert_eq!(image.get_pixel(3, 3), &BLACK);
    }

    #[test]
    fn test_draw_line_thickness() {
        let mut image = RgbImage::new(20, 20);
        draw_line(&mut image, &Point2::new(2.0, 10.0), &Point2::new(17.0, 10.0), GREEN, 1);

        assert_eq!(image.get_pixel(2, 10), &GREEN);
        assert_eq!(image.get_pixel(10, 10), &GREEN);
        assert_eq!(image.get_pixel(17, 10), &GREEN);
        assert_eq!(image.get_pixel(10, 9), &BLACK);
        assert_eq!(image.get_pixel(10, 11), &BLACK);

        let mut thick = RgbImage::new(20, 20);
        draw_line(&mut thick, &Point2::new(2.0, 10.0), &Point2::new(17.0, 10.0), GREEN, 6);
        assert_eq!(thick.get_pixel(10, 7), &GREEN);
        assert_eq!(thick.get_pixel(10, 13), &GREEN);
        assert_eq!(thick.get_pixel(10, 14), &BLACK);
    }

    #[test]
    fn test_draw_line_outside_image() {
        let mut image = RgbImage::new(10, 10);
        draw_line(
            &mut image,
            &Point2::new(-50.0, 5.0),
            &Point2::new(50.0, 5.0),
            BLUE,
            1,
        );
        assert!((0..10).all(|x| image.get_pixel(x, 5) == &BLUE));

        // Non-finite endpoints are ignored.
        draw_line(
            &mut image,
            &Point2::new(f64::NAN, 0.0),
            &Point2::new(5.0, 5.0),
            RED,
            1,
        );
        assert_eq!(image.get_pixel(0, 0), &BLACK);
    }

    #[test]
    fn test_draw_line_far_endpoint() {
        let mut image = RgbImage::new(64, 64);
        draw_line(
            &mut image,
            &Point2::new(0.0, 10.0),
            &Point2::new(1e12, 10.0),
            RED,
            8,
        );
        assert_eq!(image.get_pixel(0, 10), &RED);
        assert_eq!(image.get_pixel(63, 10), &RED);
        assert_eq!(image.get_pixel(32, 40), &BLACK);

        // Entirely outside: nothing is drawn.
        let mut untouched = RgbImage::new(64, 64);
        draw_line(
            &mut untouched,
            &Point2::new(-1e12, -500.0),
            &Point2::new(1e12, -500.0),
            RED,
            8,
        );
        assert!(untouched.pixels().all(|p| p == &BLACK));
    }

    #[test]
    fn test_clip_segment() {
        let bounds = (0.0, 0.0, 10.0, 10.0);
        let (a, b) =
            clip_segment(&Point2::new(-10.0, 5.0), &Point2::new(20.0, 5.0), bounds).unwrap();
        assert_eq!(a, Point2::new(0.0, 5.0));
        assert_eq!(b, Point2::new(10.0, 5.0));

        let (a, b) = clip_segment(&Point2::new(2.0, 3.0), &Point2::new(4.0, 6.0), bounds).unwrap();
        assert_eq!(a, Point2::new(2.0, 3.0));
        assert_eq!(b, Point2::new(4.0, 6.0));

        let left = clip_segment(&Point2::new(-5.0, -5.0), &Point2::new(-1.0, 20.0), bounds);
        assert!(left.is_none());
        let right = clip_segment(&Point2::new(11.0, 0.0), &Point2::new(11.0, 10.0), bounds);
        assert!(right.is_none());
    }

    #[test]
    fn test_draw_contour_is_closed() {
        let mut image = RgbImage::new(64, 64);
        let square = [
            Point2::new(10.0, 10.0),
            Point2::new(50.0, 10.0),
            Point2::new(50.0, 50.0),
            Point2::new(10.0, 50.0),
        ];
        draw_contour(&mut image, &square, RED, 1);

        assert_eq!(image.get_pixel(30, 10), &RED);
        assert_eq!(image.get_pixel(50, 30), &RED);
        assert_eq!(image.get_pixel(30, 50), &RED);
        // Closing edge from the last point back to the first.
        assert_eq!(image.get_pixel(10, 30), &RED);
        assert_eq!(image.get_pixel(30, 30), &BLACK);
    }

    #[test]
    fn test_draw_contour_needs_two_points() {
        let mut image = RgbImage::new(16, 16);
        draw_contour(&mut image, &[Point2::new(8.0, 8.0)], RED, 4);
        assert!(image.pixels().all(|p| p == &BLACK));
    }

    #[test]
    fn test_draw_frame_axes() {
        let mut image = RgbImage::new(640, 480);
        let intrinsics = Intrinsics::new(800.0, 800.0, 320.0, 240.0);
        let pose = PnpResult {
            rvec: Vector3::zeros(),
            tvec: Vector3::new(0.0, 0.0, 1.0),
        };

        draw_frame_axes(
            &mut image,
            &intrinsics,
            &DistortionCoefficients::default(),
            &pose,
            0.1,
            6,
        )
        .unwrap();

        // X axis ends at (400, 240), Y axis at (320, 320).
        assert_eq!(image.get_pixel(360, 240), &RED);
        assert_eq!(image.get_pixel(320, 280), &GREEN);
        // The Z axis points at the camera and is drawn last over the origin.
        assert_eq!(image.get_pixel(320, 240), &BLUE);
        assert_eq!(image.get_pixel(100, 100), &BLACK);
    }

    #[test]
    fn test_draw_frame_axes_behind_camera() {
        let mut image = RgbImage::new(64, 64);
        let pose = PnpResult {
            rvec: Vector3::zeros(),
            tvec: Vector3::new(0.0, 0.0, -1.0),
        };

        let result = draw_frame_axes(
            &mut image,
            &Intrinsics::new(50.0, 50.0, 32.0, 32.0),
            &DistortionCoefficients::default(),
            &pose,
            0.1,
            2,
        );
        assert!(matches!(result, Err(CameraModelError::PointAtCameraCenter)));
        assert!(image.pixels().all(|p| p == &BLACK));
    }
}
