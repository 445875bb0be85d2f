//! The planar target: an A4 sheet of paper lying on the world `z = 0` plane.
//!
//! The world frame has its origin at the bottom-left corner of the sheet,
//! `x` along the short (bottom) edge and `y` along the long edge, in meters.

use nalgebra::{Point2, Point3};

/// Width of an A4 sheet, in meters.
pub const A4_WIDTH: f64 = 0.21;
/// Height of an A4 sheet, in meters.
pub const A4_HEIGHT: f64 = 0.297;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TargetError {
    #[error("An A4 sheet needs exactly 4 corners, got {0}")]
    WrongCornerCount(usize),
}

/// Image projections of the four corners of an A4 sheet.
///
/// Corners are given counter-clockwise starting at the bottom left. No
/// convexity or ordering check is made; a wrong order only shows up as a bad
/// pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct A4SheetOfPaper {
    pub bottom_left: Point2<f64>,
    pub bottom_right: Point2<f64>,
    pub top_right: Point2<f64>,
    pub top_left: Point2<f64>,
}

impl A4SheetOfPaper {
    /// Creates a sheet from its four corners.
    ///
    /// # Arguments
    ///
    /// * `bottom_left`, `bottom_right`, `top_right`, `top_left` - Pixel
    ///   positions of the corners, counter-clockwise from the bottom left.
    pub fn new(
        bottom_left: Point2<f64>,
        bottom_right: Point2<f64>,
        top_right: Point2<f64>,
        top_left: Point2<f64>,
    ) -> Self {
        A4SheetOfPaper {
            bottom_left,
            bottom_right,
            top_right,
            top_left,
        }
    }

    /// Builds a sheet from exactly four corners, bottom-left first, counter-clockwise.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nalgebra::Point2;
    /// use paper_pnp::target::A4SheetOfPaper;
    ///
    /// let corners = [
    ///     Point2::new(236.0, 121.2),
    ///     Point2::new(404.0, 121.2),
    ///     Point2::new(404.0, 358.8),
    ///     Point2::new(236.0, 358.8),
    /// ];
    /// let sheet = A4SheetOfPaper::from_points(&corners).unwrap();
    /// assert_eq!(sheet.top_right, corners[2]);
    ///
    /// assert!(A4SheetOfPaper::from_points(&corners[..3]).is_err());
    /// ```
    pub fn from_points(points: &[Point2<f64>]) -> Result<Self, TargetError> {
        match points {
            [bottom_left, bottom_right, top_right, top_left] => Ok(Self::new(
                *bottom_left,
                *bottom_right,
                *top_right,
                *top_left,
            )),
            _ => Err(TargetError::WrongCornerCount(points.len())),
        }
    }

    /// Image corners in correspondence order.
    pub fn image_points(&self) -> [Point2<f64>; 4] {
        [
            self.bottom_left,
            self.bottom_right,
            self.top_right,
            self.top_left,
        ]
    }

    /// World coordinates of the corners, in the same order as [`Self::image_points`].
    pub fn object_points() -> [Point3<f64>; 4] {
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(A4_WIDTH, 0.0, 0.0),
            Point3::new(A4_WIDTH, A4_HEIGHT, 0.0),
            Point3::new(0.0, A4_HEIGHT, 0.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_points_layout() {
        let points = A4SheetOfPaper::object_points();
        assert_eq!(points[0], Point3::origin());
        assert_eq!(points[1], Point3::new(0.21, 0.0, 0.0));
        assert_eq!(points[2], Point3::new(0.21, 0.297, 0.0));
        assert_eq!(points[3], Point3::new(0.0, 0.297, 0.0));
        assert!(points.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_image_points_follow_corner_order() {
        let sheet = A4SheetOfPaper::new(
            Point2::new(1.0, 2.0),
            Point2::new(3.0, 4.0),
            Point2::new(5.0, 6.0),
            Point2::new(7.0, 8.0),
        );
        let points = sheet.image_points();
        assert_eq!(points[0], sheet.bottom_left);
        assert_eq!(points[1], sheet.bottom_right);
        assert_eq!(points[2], sheet.top_right);
        assert_eq!(points[3], sheet.top_left);
    }

    #[test]
    fn test_from_points_requires_four_corners() {
        let points = [Point2::new(0.0, 0.0); 5];
        assert_eq!(
            A4SheetOfPaper::from_points(&points),
            Err(TargetError::WrongCornerCount(5))
        );
        assert_eq!(
            A4SheetOfPaper::from_points(&[]),
            Err(TargetError::WrongCornerCount(0))
        );
        assert!(A4SheetOfPaper::from_points(&points[..4]).is_ok());
    }
}
